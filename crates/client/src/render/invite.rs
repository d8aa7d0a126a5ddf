//! Invite link resolution.
//!
//! Invite and share links redirect in page script, so the final project URL
//! is only known after a browser has loaded them with the session cookie.

use chromiumoxide::cdp::browser_protocol::network::{CookieParam, SetCookiesParams};

use lanhu_core::Error;

use super::{BrowserBackend, RenderError, launch};

/// `name=value` pairs of a cookie header; malformed parts are dropped.
pub fn cookie_pairs(cookie: &str) -> Vec<(&str, &str)> {
    cookie
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

/// Cookie domain covering `base_url` and its subdomains, e.g. `.lanhuapp.com`.
pub fn cookie_domain(base_url: &str) -> Option<String> {
    let parsed = url::Url::parse(base_url).ok()?;
    let host = parsed.host_str()?;
    Some(format!(".{}", host.trim_start_matches("www.")))
}

fn browser_cookies(cookie: &str, domain: &str) -> Vec<CookieParam> {
    cookie_pairs(cookie)
        .into_iter()
        .filter_map(|(name, value)| CookieParam::builder().name(name).value(value).domain(domain).path("/").build().ok())
        .collect()
}

impl BrowserBackend {
    /// Load `invite_url` with the session cookie and return the URL the page
    /// settles on.
    pub async fn resolve_redirect(
        &self, invite_url: &str, cookie: Option<&str>, base_url: &str,
    ) -> Result<String, Error> {
        if !self.options.enabled {
            return Err(Error::RenderDisabled);
        }

        let (mut browser, page, handler) = launch(&self.options).await?;

        let navigate = async {
            if let (Some(cookie), Some(domain)) = (cookie, cookie_domain(base_url)) {
                let cookies = browser_cookies(cookie, &domain);
                if !cookies.is_empty() {
                    page.execute(SetCookiesParams::new(cookies))
                        .await
                        .map_err(|e| RenderError::Navigation(format!("setting cookies: {e}")))?;
                }
            }

            page.goto(invite_url).await.map_err(|e| RenderError::Navigation(e.to_string()))?;
            page.wait_for_navigation().await.map_err(|e| RenderError::Navigation(e.to_string()))?;
            tokio::time::sleep(self.options.settle).await;

            page.url()
                .await
                .map_err(|e| RenderError::Navigation(e.to_string()))?
                .ok_or_else(|| RenderError::Navigation("page has no URL".into()))
        };

        let timeout = self.options.timeout + self.options.settle;
        let resolved = tokio::time::timeout(timeout, navigate)
            .await
            .unwrap_or_else(|_| Err(RenderError::Timeout(timeout.as_millis() as u64)));

        page.close().await.ok();
        browser.close().await.ok();
        browser.wait().await.ok();
        handler.abort();

        let resolved = resolved?;
        tracing::debug!(invite_url, resolved = %resolved, "invite link resolved");
        Ok(resolved)
    }
}
