// Error page rendering
// Pure function of (model, style): the same input always yields the same bytes

use super::ErrorPageModel;

/// Inline styling of the error page
///
/// Pages are served without external stylesheets, so every rule is inlined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageStyle {
    pub font_family: &'static str,
    pub container_width_px: u32,
    pub cta_background: &'static str,
    pub cta_color: &'static str,
    pub cta_padding_px: u32,
    pub cta_radius_px: u32,
}

impl Default for PageStyle {
    fn default() -> Self {
        Self {
            font_family: "system-ui",
            container_width_px: 500,
            cta_background: "#4054B2",
            cta_color: "#FFFFFF",
            cta_padding_px: 12,
            cta_radius_px: 200,
        }
    }
}

impl PageStyle {
    fn body_css(&self) -> String {
        format!(
            "width:100%;height:100%;display:flex;align-items:center;flex-direction:column;\
             justify-content:center;box-sizing:border-box;border-right:0;overflow:auto;\
             margin:0;font-family:{}",
            self.font_family
        )
    }

    fn container_css(&self) -> String {
        format!(
            "width:{}px;display:flex;align-items:start;flex-direction:column;\
             justify-content:center;box-sizing:border-box;margin:0",
            self.container_width_px
        )
    }

    fn cta_css(&self) -> String {
        format!(
            "display:block;background-color:{};color:{};padding:{}px;border-radius:{}px;\
             text-decoration:none",
            self.cta_background, self.cta_color, self.cta_padding_px, self.cta_radius_px
        )
    }
}

const SUPER_TITLE_CSS: &str = "display:block;text-transform:uppercase";
const TITLE_CSS: &str = "font-weight:normal";

/// Render a page model as a complete HTML document
pub fn render_page(model: &ErrorPageModel, style: &PageStyle) -> String {
    let call_to_action = model
        .call_to_action
        .as_ref()
        .map(|cta| {
            format!(
                r#"<a href="{}" style="{}">{}</a>"#,
                escape_html(&cta.target_url),
                style.cta_css(),
                escape_html(&cta.text)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html><html lang="en"><head><meta charset="utf-8"><title>{title}</title></head><body style="{body_css}"><div style="{container_css}"><div style="{SUPER_TITLE_CSS}">{super_title}</div><h1 style="{TITLE_CSS}">{title}</h1><p>{message}</p>{call_to_action}</div></body></html>"#,
        title = escape_html(model.title),
        body_css = style.body_css(),
        container_css = style.container_css(),
        super_title = escape_html(model.super_title),
        message = escape_html(&model.message),
    )
}

/// Escape text for HTML content and double-quoted attributes
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
