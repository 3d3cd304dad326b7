//! [`BrowserSurface`] backed by a W3C WebDriver session (chromedriver,
//! geckodriver, or a Selenium grid) through `fantoccini`.

use fantoccini::elements::Element;
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};

use crate::browser::{BrowserSurface, Selector};
use crate::error::BrowserError;

const CHROME_ARGS: [&str; 2] = ["--no-sandbox", "--disable-dev-shm-usage"];

/// A live WebDriver session.
///
/// The session must be released with [`WebDriverSurface::close`]; dropping
/// the value leaves the remote browser running until the driver reaps it.
pub struct WebDriverSurface {
    client: Client,
}

impl WebDriverSurface {
    /// Starts a Chrome session on the WebDriver endpoint at `webdriver_url`.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Session`] if the endpoint is unreachable or
    /// refuses the session.
    pub async fn connect(webdriver_url: &str, headless: bool) -> Result<Self, BrowserError> {
        let client = ClientBuilder::rustls()
            .map_err(|e| BrowserError::Session(e.to_string()))?
            .capabilities(chrome_capabilities(headless))
            .connect(webdriver_url)
            .await
            .map_err(|e| BrowserError::Session(e.to_string()))?;
        tracing::info!(webdriver_url, headless, "browser session started");
        Ok(Self { client })
    }

    /// Ends the session and closes the browser.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Driver`] if the driver rejects the request.
    pub async fn close(self) -> Result<(), BrowserError> {
        self.client.close().await.map_err(map_cmd_error)?;
        tracing::info!("browser session closed");
        Ok(())
    }
}

fn chrome_capabilities(headless: bool) -> Map<String, Value> {
    let mut args: Vec<&str> = CHROME_ARGS.to_vec();
    if headless {
        args.push("--headless=new");
    }
    let mut caps = Map::new();
    caps.insert("browserName".to_owned(), json!("chrome"));
    caps.insert("goog:chromeOptions".to_owned(), json!({ "args": args }));
    caps
}

fn to_locator(selector: &Selector) -> Locator<'_> {
    match selector {
        Selector::Id(v) => Locator::Id(v),
        Selector::Css(v) | Selector::Tag(v) => Locator::Css(v),
    }
}

fn map_cmd_error(err: CmdError) -> BrowserError {
    match &err {
        CmdError::Standard(e) if e.error == ErrorStatus::StaleElementReference => {
            BrowserError::Stale
        }
        _ => BrowserError::Driver(err.to_string()),
    }
}

/// Maps a lookup result, turning "no such element" into `Ok(None)`.
fn found(result: Result<Element, CmdError>) -> Result<Option<Element>, BrowserError> {
    match result {
        Ok(element) => Ok(Some(element)),
        Err(err) if err.is_no_such_element() => Ok(None),
        Err(err) => Err(map_cmd_error(err)),
    }
}

impl BrowserSurface for WebDriverSurface {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        tracing::debug!(url, "navigating");
        self.client.goto(url).await.map_err(map_cmd_error)
    }

    async fn locate(&self, selector: &Selector) -> Result<Option<Element>, BrowserError> {
        found(self.client.find(to_locator(selector)).await)
    }

    async fn locate_all(&self, selector: &Selector) -> Result<Vec<Element>, BrowserError> {
        self.client
            .find_all(to_locator(selector))
            .await
            .map_err(map_cmd_error)
    }

    async fn locate_within(
        &self,
        parent: &Element,
        selector: &Selector,
    ) -> Result<Option<Element>, BrowserError> {
        found(parent.find(to_locator(selector)).await)
    }

    async fn locate_all_within(
        &self,
        parent: &Element,
        selector: &Selector,
    ) -> Result<Vec<Element>, BrowserError> {
        parent
            .find_all(to_locator(selector))
            .await
            .map_err(map_cmd_error)
    }

    async fn click(&self, element: &Element) -> Result<(), BrowserError> {
        element.click().await.map_err(map_cmd_error)
    }

    async fn scripted_click(&self, element: &Element) -> Result<(), BrowserError> {
        let arg = serde_json::to_value(element)?;
        self.client
            .execute("arguments[0].click();", vec![arg])
            .await
            .map(|_| ())
            .map_err(map_cmd_error)
    }

    async fn read_text(&self, element: &Element) -> Result<String, BrowserError> {
        element.text().await.map_err(map_cmd_error)
    }

    async fn read_attribute(
        &self,
        element: &Element,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        element.attr(name).await.map_err(map_cmd_error)
    }

    async fn is_stale(&self, element: &Element) -> Result<bool, BrowserError> {
        match element.tag_name().await {
            Ok(_) => Ok(false),
            Err(err) => match map_cmd_error(err) {
                BrowserError::Stale => Ok(true),
                other => Err(other),
            },
        }
    }
}
