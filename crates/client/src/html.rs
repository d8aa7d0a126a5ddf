//! Markup fix-up applied to prototype pages as they are downloaded.
//!
//! Lanhu serves Axure exports with lazy-loaded resources and a hidden body,
//! which render as blank pages when opened from a plain file server:
//!
//! - `data-src` on `img`/`script` becomes `src`, on `link` becomes `href`
//! - `display:none` and `opacity:0` are stripped from the body style
//! - inline scripts referencing the vendor analytics host are emptied
//! - a `lanhu_Axure_Mapping_Data` shim is injected at the top of `<head>`

use std::cell::RefCell;
use std::rc::Rc;

use lol_html::errors::RewritingError;
use lol_html::html_content::{ContentType, EndTag};
use lol_html::{RewriteStrSettings, element, rewrite_str, text};

const VENDOR_SCRIPT_HOST: &str = "alistatic.lanhuapp.com";

const MAPPING_SHIM: &str = "<script>\nfunction lanhu_Axure_Mapping_Data(data) {\n    return data;\n}\n</script>";

/// Drop `display:none` and `opacity:0` declarations, keeping everything else.
fn unhide_style(style: &str) -> String {
    style
        .split(';')
        .map(str::trim)
        .filter(|decl| !decl.is_empty())
        .filter(|decl| {
            let compact = decl.split_whitespace().collect::<String>().to_ascii_lowercase();
            compact != "display:none" && compact != "opacity:0"
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Rewrite one page of prototype markup so it renders from a local server.
pub fn fix_markup(html: &str) -> Result<String, RewritingError> {
    let script_body = Rc::new(RefCell::new(String::new()));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("img[data-src]", |el| {
                    if let Some(src) = el.get_attribute("data-src") {
                        el.set_attribute("src", &src)?;
                        el.remove_attribute("data-src");
                    }
                    Ok(())
                }),
                element!("link[data-src]", |el| {
                    if let Some(href) = el.get_attribute("data-src") {
                        el.set_attribute("href", &href)?;
                        el.remove_attribute("data-src");
                    }
                    Ok(())
                }),
                element!("body[style]", |el| {
                    if let Some(style) = el.get_attribute("style") {
                        let style = unhide_style(&style);
                        if style.is_empty() {
                            el.remove_attribute("style");
                        } else {
                            el.set_attribute("style", &style)?;
                        }
                    }
                    Ok(())
                }),
                element!("head", |el| {
                    el.prepend(MAPPING_SHIM, ContentType::Html);
                    Ok(())
                }),
                element!("script", {
                    let script_body = Rc::clone(&script_body);
                    move |el| {
                        if let Some(src) = el.get_attribute("data-src") {
                            el.set_attribute("src", &src)?;
                            el.remove_attribute("data-src");
                        }
                        script_body.borrow_mut().clear();

                        let script_body = Rc::clone(&script_body);
                        if let Some(handlers) = el.end_tag_handlers() {
                            handlers.push(Box::new(move |end: &mut EndTag<'_>| {
                                let body = std::mem::take(&mut *script_body.borrow_mut());
                                if !body.contains(VENDOR_SCRIPT_HOST) {
                                    end.before(&body, ContentType::Html);
                                }
                                Ok(())
                            }) as _);
                        }
                        Ok(())
                    }
                }),
                text!("script", {
                    let script_body = Rc::clone(&script_body);
                    move |t| {
                        script_body.borrow_mut().push_str(t.as_str());
                        t.remove();
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_sources_are_promoted() {
        let html = r#"<html><head><link rel="stylesheet" data-src="resources/css/axure.css"></head><body><img data-src="images/a.png"><script data-src="data/document.js"></script></body></html>"#;
        let fixed = fix_markup(html).unwrap();

        assert!(fixed.contains(r#"href="resources/css/axure.css""#));
        assert!(fixed.contains(r#"<img src="images/a.png">"#));
        assert!(fixed.contains(r#"src="data/document.js""#));
        assert!(!fixed.contains("data-src"));
    }

    #[test]
    fn test_hidden_body_style_is_stripped() {
        let fixed = fix_markup(r#"<body style="display: none; opacity:0;">x</body>"#).unwrap();
        assert!(fixed.contains("<body>x</body>"));

        let fixed = fix_markup(r#"<body style="display:none;background:#fff">x</body>"#).unwrap();
        assert!(fixed.contains(r##"<body style="background:#fff">"##));
    }

    #[test]
    fn test_unhide_style_keeps_partial_opacity() {
        assert_eq!(unhide_style("opacity: 0.5; display : none"), "opacity: 0.5");
        assert_eq!(unhide_style("DISPLAY:NONE;"), "");
    }

    #[test]
    fn test_vendor_scripts_are_emptied_and_others_kept() {
        let html = concat!(
            "<head></head><body>",
            "<script>var s = 'https://alistatic.lanhuapp.com/track.js';</script>",
            "<script>var page = 1;</script>",
            "</body>"
        );
        let fixed = fix_markup(html).unwrap();

        assert!(!fixed.contains(VENDOR_SCRIPT_HOST));
        assert!(fixed.contains("<script>var page = 1;</script>"));
    }

    #[test]
    fn test_mapping_shim_is_injected_first_in_head() {
        let fixed = fix_markup("<html><head><script>start();</script></head><body></body></html>").unwrap();
        let shim = fixed.find("function lanhu_Axure_Mapping_Data").unwrap();
        let existing = fixed.find("start();").unwrap();
        assert!(shim < existing);
    }

    #[test]
    fn test_markup_without_head_is_left_alone() {
        let fixed = fix_markup("<p>plain</p>").unwrap();
        assert_eq!(fixed, "<p>plain</p>");
    }
}
