//! Client-only page shells.
//!
//! A shell pairs one route with one deferred UI bundle. The server renders nothing of
//! the bundle itself: it returns a document with a mount node (and optionally a
//! loading placeholder) and lets the browser fetch and start the bundle.

/// Where bundles are served from. Lives under the matcher-excluded static prefix.
pub const BUNDLE_ROOT: &str = "/_next/static/bundles";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageShell {
    pub route: &'static str,
    pub title: &'static str,
    /// Bundle file stem under `BUNDLE_ROOT`.
    pub bundle: &'static str,
    /// Shown inside the mount node until the bundle replaces it.
    pub placeholder: Option<&'static str>,
}

/// Main application.
pub const APP_SHELL: PageShell = PageShell {
    route: "/app",
    title: "Superglobal",
    bundle: "app-content",
    placeholder: None,
};

/// Globe view. The globe needs WebGL and `window`, so it can only start in the browser.
pub const MAP_SHELL: PageShell = PageShell {
    route: "/map",
    title: "Superglobal · Map",
    bundle: "map-content",
    placeholder: Some("Loading your world map..."),
};

/// Sign-in form. Target of the gate's login redirect, which passes `callbackUrl`
/// through the query string for the bundle to read.
pub const LOGIN_SHELL: PageShell = PageShell {
    route: "/auth/login",
    title: "Superglobal · Sign in",
    bundle: "login-content",
    placeholder: None,
};

pub const SIGNUP_SHELL: PageShell = PageShell {
    route: "/auth/signup",
    title: "Superglobal · Sign up",
    bundle: "signup-content",
    placeholder: None,
};

pub const SHELLS: [PageShell; 4] = [APP_SHELL, MAP_SHELL, LOGIN_SHELL, SIGNUP_SHELL];

impl PageShell {
    pub fn bundle_src(&self) -> String {
        format!("{}/{}.js", BUNDLE_ROOT, self.bundle)
    }

    pub fn render(&self) -> String {
        let placeholder = self
            .placeholder
            .map(|text| {
                format!(
                    concat!(
                        r#"<div class="shell-loading"><div class="shell-spinner"></div>"#,
                        "<p>{}</p></div>"
                    ),
                    text
                )
            })
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<script type="module" src="{src}" defer></script>
</head>
<body>
<div id="root" data-bundle="{bundle}">{placeholder}</div>
</body>
</html>
"#,
            title = self.title,
            src = self.bundle_src(),
            bundle = self.bundle,
            placeholder = placeholder,
        )
    }
}
