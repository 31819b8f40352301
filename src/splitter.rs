use lazy_static::lazy_static;
use regex::Regex;

pub const STYLESHEET_PATH: &str = "assets/styles.css";
pub const SCRIPT_PATH: &str = "assets/script.js";

const STYLES_PLACEHOLDER: &str = "/* Styles */";
const SCRIPTS_PLACEHOLDER: &str = "// Scripts";

/// Separated file contents for one exported project. Built fresh for each
/// export request; never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectBundle {
    pub index_html: String,
    pub styles_css: String,
    pub script_js: String,
    pub readme: String,
}

impl ProjectBundle {
    /// Folder entries the archive carries alongside the files.
    pub fn asset_dirs() -> &'static [&'static str] {
        &["assets", "assets/images"]
    }
}

/// Splits a finished single-file document into a static project: inline
/// styles and src-less scripts move to external bundles, the HTML gets
/// exactly one stylesheet link and one script tag wired to the fixed asset
/// paths. Script tags referencing an external `src` stay where they are.
pub fn split(final_html: &str, project_name: &str) -> ProjectBundle {
    lazy_static! {
        static ref STYLE_RE: Regex = Regex::new(r"(?is)<style[^>]*>(.*?)</style>").unwrap();
        static ref SCRIPT_RE: Regex = Regex::new(r"(?is)(<script[^>]*>)(.*?)</script>").unwrap();
        static ref SRC_ATTR_RE: Regex = Regex::new(r#"(?i)\ssrc\s*="#).unwrap();
    }

    let styles: Vec<&str> = STYLE_RE
        .captures_iter(final_html)
        .map(|caps| caps.get(1).unwrap().as_str())
        .collect();
    let scripts: Vec<&str> = SCRIPT_RE
        .captures_iter(final_html)
        .filter(|caps| !SRC_ATTR_RE.is_match(caps.get(1).unwrap().as_str()))
        .map(|caps| caps.get(2).unwrap().as_str())
        .collect();

    let styles_css = styles.join("\n\n");
    let script_js = scripts.join("\n\n");

    let stripped = STYLE_RE.replace_all(final_html, "").to_string();
    let stripped = SCRIPT_RE
        .replace_all(&stripped, |caps: &regex::Captures| {
            if SRC_ATTR_RE.is_match(&caps[1]) {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .to_string();

    ProjectBundle {
        index_html: wire_asset_links(&stripped),
        styles_css: if styles_css.trim().is_empty() {
            STYLES_PLACEHOLDER.to_string()
        } else {
            styles_css
        },
        script_js: if script_js.trim().is_empty() {
            SCRIPTS_PLACEHOLDER.to_string()
        } else {
            script_js
        },
        readme: render_readme(project_name),
    }
}

/// At most one rewrite per asset: the link and script tags are inserted
/// only when the anchor exists and no reference to the asset path is
/// already present.
fn wire_asset_links(html: &str) -> String {
    let mut html = html.to_string();
    if !html.contains(STYLESHEET_PATH) {
        html = html.replacen(
            "</head>",
            &format!("  <link rel=\"stylesheet\" href=\"{STYLESHEET_PATH}\" />\n</head>"),
            1,
        );
    }
    if !html.contains(SCRIPT_PATH) {
        html = html.replacen(
            "</body>",
            &format!("  <script src=\"{SCRIPT_PATH}\"></script>\n</body>"),
            1,
        );
    }
    html
}

fn render_readme(project_name: &str) -> String {
    format!(
        "# {project_name}\n\n\
         Static site exported from Sitesmith.\n\n\
         How to use:\n\
         - Open index.html in a browser\n\
         - Or open the folder in VS Code and use Live Server\n\n\
         Structure:\n\
         - index.html\n\
         - assets/styles.css\n\
         - assets/script.js\n\
         - assets/images/\n"
    )
}
