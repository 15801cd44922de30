use crate::{
    AppState,
    session::{self, FLASH_COOKIE, SessionData},
};
use axum::{
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE},
    response::{Html, IntoResponse, Response},
};
use pulldown_cmark::{Options, Parser, html};
use std::{collections::HashMap, path::PathBuf, sync::Arc, time::SystemTime};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

pub struct TemplateEngine {
    template_dir: PathBuf,
    cache: Arc<RwLock<HashMap<String, CachedTemplate>>>,
}

struct CachedTemplate {
    content: String,
    modified: SystemTime,
}

impl TemplateEngine {
    pub fn new(template_dir: PathBuf) -> Self {
        Self {
            template_dir,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn load_template(&self, path: &str) -> Result<String, String> {
        let template_path = self.template_dir.join(path);

        let metadata = tokio::fs::metadata(&template_path)
            .await
            .map_err(|e| format!("Failed to get metadata for {}: {}", path, e))?;

        let modified = metadata
            .modified()
            .map_err(|e| format!("Failed to get modified time: {}", e))?;

        let mut cache = self.cache.write().await;

        if let Some(cached) = cache.get(path)
            && cached.modified >= modified
        {
            debug!("Using cached template for {}", path);
            return Ok(cached.content.clone());
        }

        info!("Loading template: {}", path);

        let content = tokio::fs::read_to_string(&template_path)
            .await
            .map_err(|e| format!("Failed to read template {}: {}", path, e))?;

        cache.insert(
            path.to_string(),
            CachedTemplate {
                content: content.clone(),
                modified,
            },
        );

        Ok(content)
    }

    fn render_source(source: &str, globals: &liquid::Object) -> Result<String, String> {
        let parser = liquid::ParserBuilder::with_stdlib()
            .build()
            .map_err(|e| format!("Failed to create parser: {}", e))?;

        let template = parser
            .parse(source)
            .map_err(|e| format!("Failed to parse template: {}", e))?;

        template
            .render(globals)
            .map_err(|e| format!("Failed to render template: {}", e))
    }

    /// Render `template_name` with `header` and `footer` partials, both of
    /// which see the same globals as the page itself.
    pub async fn render_template(
        &self,
        template_name: &str,
        globals: liquid::Object,
    ) -> Result<String, String> {
        let mut full_globals = globals;

        for (key, partial) in [
            ("header", "_header.html.liquid"),
            ("footer", "_footer.html.liquid"),
        ] {
            let rendered = match self.load_template(partial).await {
                Ok(source) => Self::render_source(&source, &full_globals).unwrap_or_else(|e| {
                    error!("Failed to render {}: {}", partial, e);
                    String::new()
                }),
                Err(e) => {
                    error!("Failed to load {}: {}", partial, e);
                    String::new()
                }
            };
            full_globals.insert(
                key.into(),
                liquid::model::Value::Scalar(rendered.into()),
            );
        }

        let template_content = self.load_template(template_name).await?;
        Self::render_source(&template_content, &full_globals)
    }
}

pub fn render_markdown(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(source, options);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

/// A full HTML page: the page template plus the values every page shares
/// (site settings, pending flashes, admin flag and title).
pub struct Page {
    template: &'static str,
    title: String,
    globals: liquid::Object,
    cookies: Vec<String>,
}

impl Page {
    pub fn new(template: &'static str, title: impl Into<String>, globals: liquid::Object) -> Self {
        Self {
            template,
            title: title.into(),
            globals,
            cookies: Vec::new(),
        }
    }

    pub fn with_cookie(mut self, cookie: String) -> Self {
        self.cookies.push(cookie);
        self
    }

    pub async fn render(self, app_state: &AppState, headers: &HeaderMap) -> Response {
        let app = &app_state.config.app;
        let is_admin = SessionData::from_headers(headers, &app.session_secret, app.session_ttl_hours)
            .is_some_and(|session| session.admin);
        let flashes = session::read_flashes(headers, &app.session_secret);

        let site_settings = match app_state.gallery.site_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                error!("Failed to load site settings: {}", e);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        let mut globals = liquid::object!({
            "site_settings": site_settings,
            "flashes": flashes,
            "is_admin": is_admin,
            "page_title": self.title,
            "app_name": app.name,
        });
        globals.extend(self.globals);

        let html = match app_state
            .template_engine
            .render_template(self.template, globals)
            .await
        {
            Ok(html) => html,
            Err(e) => {
                error!("Template rendering error for {}: {}", self.template, e);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        let mut cookies = self.cookies;
        if !flashes.is_empty() {
            cookies.push(session::clear_cookie(FLASH_COOKIE));
        }

        let mut response = Html(html).into_response();
        for cookie in cookies {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(e) => error!("Invalid cookie header: {}", e),
            }
        }
        response
    }
}
