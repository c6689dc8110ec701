/// Response marker set by the host when it renders a page template.
///
/// Attach it with [`axum::Extension`] to the response of a handler. When the
/// template is the login page, the gateway replaces the response with a CAS
/// login round-trip.
///
/// ```rust,ignore
/// async fn login_page(Form(form): Form<LoginForm>) -> impl IntoResponse {
///     let marker = TemplateRender::new("login").with_posted_url(form.url);
///     (Extension(marker), Html(render_login()))
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRender {
    pub template: String,
    /// `_url` parameter posted with the request, if any.
    pub posted_url: Option<String>,
}

impl TemplateRender {
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            posted_url: None,
        }
    }

    #[must_use]
    pub fn with_posted_url(mut self, url: Option<String>) -> Self {
        self.posted_url = url;
        self
    }
}
