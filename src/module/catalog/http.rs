use crate::domain::{ArticleSource, ArticleSummary};
use crate::library::BoxedError;
use async_trait::async_trait;
use hyper::client::HttpConnector;
use hyper::header::{ACCEPT, AUTHORIZATION};
use hyper::{Body, Client, Method, Request, StatusCode};
use log::debug;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// Default time the catalog may take to answer
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors occurring while fetching articles from the catalog API
#[derive(Error, Debug)]
pub enum HttpSourceError {
    /// The request could not be assembled, usually due to an invalid URL
    #[error("invalid catalog request")]
    InvalidRequest(#[from] hyper::http::Error),
    /// The request could not be sent or the body not be read
    #[error("catalog request failed")]
    RequestFailed(#[from] hyper::Error),
    /// The catalog did not answer in time
    #[error("catalog did not respond within {0:?}")]
    Timeout(Duration),
    /// The catalog answered with an unexpected status
    #[error("catalog responded with status {0}")]
    UnexpectedStatus(StatusCode),
    /// The body is not valid JSON
    #[error("malformed catalog response")]
    MalformedBody(#[from] serde_json::Error),
    /// The body does not describe an article
    #[error("catalog response carries no article identifier")]
    MissingIdentifier,
}

/// [`ArticleSource`] querying the catalog REST API
///
/// Issues `GET <base>/articles/<id>` and forwards the token as bearer authorization.
#[derive(Clone)]
pub struct HttpArticleSource {
    client: Client<HttpConnector>,
    base_url: String,
    timeout: Duration,
}

impl HttpArticleSource {
    /// Creates a new instance for the catalog API at the given base URL
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout,
        }
    }

    async fn fetch(
        &self,
        article_id: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<ArticleSummary>, HttpSourceError> {
        let mut request = Request::builder()
            .method(Method::GET)
            .uri(format!(
                "{}/articles/{}",
                self.base_url,
                urlencoding::encode(article_id)
            ))
            .header(ACCEPT, "application/json");

        if let Some(token) = auth_token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = self.client.request(request.body(Body::empty())?).await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => {
                return Err(HttpSourceError::UnexpectedStatus(status))
            }
            _ => {}
        }

        let body = hyper::body::to_bytes(response.into_body()).await?;
        parse_article(&body).map(Some)
    }
}

#[async_trait]
impl ArticleSource for HttpArticleSource {
    async fn fetch_article(
        &self,
        article_id: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<ArticleSummary>, BoxedError> {
        // Dot segments would address another resource even when encoded
        if matches!(article_id, "" | "." | "..") {
            return Ok(None);
        }

        debug!("Fetching article {} from {}", article_id, self.base_url);

        match timeout(self.timeout, self.fetch(article_id, auth_token)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(HttpSourceError::Timeout(self.timeout).into()),
        }
    }
}

/// Reads an article either from a `data` envelope or from the root object
fn parse_article(body: &[u8]) -> Result<ArticleSummary, HttpSourceError> {
    let root: Value = serde_json::from_slice(body)?;
    let object = match root.get("data") {
        Some(data) if data.is_object() => data,
        _ => &root,
    };

    let text = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()
    };

    let id = object
        .get("_id")
        .or_else(|| object.get("id"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or(HttpSourceError::MissingIdentifier)?;

    let stock = object
        .get("stock")
        .and_then(|stock| stock.as_i64().or_else(|| stock.as_f64().map(|s| s as i64)))
        .unwrap_or_default();

    Ok(ArticleSummary {
        id: id.to_owned(),
        name: text("name"),
        description: text("description"),
        image: text("image"),
        price: object
            .get("price")
            .and_then(Value::as_f64)
            .unwrap_or_default(),
        stock,
        enabled: object
            .get("enabled")
            .and_then(Value::as_bool)
            .unwrap_or(true),
    })
}

#[cfg(test)]
mod does {
    use super::*;
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Response, Server};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<(String, Option<String>)>>>;

    /// Serves a fixed catalog and records requested paths and authorization headers
    fn serve() -> (String, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();

        let make_svc = make_service_fn(move |_| {
            let recorder = recorder.clone();

            async move {
                Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                    let authorization = req
                        .headers()
                        .get(AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(ToOwned::to_owned);

                    recorder
                        .lock()
                        .unwrap()
                        .push((req.uri().path().to_owned(), authorization));

                    let (status, body) = match req.uri().path() {
                        "/articles/X" => (
                            StatusCode::OK,
                            json!({ "data": { "_id": "X", "name": "Widget", "price": 9.5, "stock": 3.7 } }),
                        ),
                        "/articles/R" => (
                            StatusCode::OK,
                            json!({ "_id": "R", "name": "Root", "enabled": false }),
                        ),
                        "/articles/E" => (StatusCode::INTERNAL_SERVER_ERROR, json!({})),
                        "/articles/B" => (StatusCode::OK, json!({ "name": "Nameless" })),
                        _ => (StatusCode::NOT_FOUND, json!({})),
                    };

                    let response = Response::builder()
                        .status(status)
                        .body(Body::from(body.to_string()))
                        .unwrap();

                    async move { Ok::<_, Infallible>(response) }
                }))
            }
        });

        let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
        let url = format!("http://{}", server.local_addr());
        tokio::spawn(server);

        (url, seen)
    }

    fn source(url: &str) -> HttpArticleSource {
        HttpArticleSource::new(url, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn read_enveloped_article() {
        let (url, _) = serve();

        let article = source(&url).fetch_article("X", None).await.unwrap().unwrap();

        assert_eq!(article.id, "X");
        assert_eq!(article.name, "Widget");
        assert_eq!(article.price, 9.5);
        assert_eq!(article.stock, 3);
        assert!(article.enabled);
    }

    #[tokio::test]
    async fn read_root_article() {
        let (url, _) = serve();

        let article = source(&url).fetch_article("R", None).await.unwrap().unwrap();

        assert_eq!(article, ArticleSummary::new("R", "Root").with_enabled(false));
    }

    #[tokio::test]
    async fn treat_missing_article_as_absent() {
        let (url, _) = serve();

        assert_eq!(source(&url).fetch_article("Z", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn fail_on_error_status() {
        let (url, _) = serve();

        assert!(source(&url).fetch_article("E", None).await.is_err());
    }

    #[tokio::test]
    async fn fail_on_missing_identifier() {
        let (url, _) = serve();

        assert!(source(&url).fetch_article("B", None).await.is_err());
    }

    #[tokio::test]
    async fn forward_bearer_token() {
        let (url, seen) = serve();

        source(&url).fetch_article("X", Some("secret")).await.unwrap();
        source(&url).fetch_article("X", None).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("/articles/X".to_owned(), Some("Bearer secret".to_owned())),
                ("/articles/X".to_owned(), None)
            ]
        );
    }

    #[tokio::test]
    async fn skip_request_for_empty_identifier() {
        let (url, seen) = serve();

        assert_eq!(source(&url).fetch_article("", None).await.unwrap(), None);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn encode_identifier_as_single_segment() {
        let (url, seen) = serve();

        assert_eq!(source(&url).fetch_article("a b", None).await.unwrap(), None);
        assert_eq!(
            source(&url).fetch_article("../admin", Some("secret")).await.unwrap(),
            None
        );

        let paths: Vec<String> = seen.lock().unwrap().iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(paths, vec!["/articles/a%20b", "/articles/..%2Fadmin"]);
    }

    #[tokio::test]
    async fn skip_request_for_dot_segments() {
        let (url, seen) = serve();

        assert_eq!(source(&url).fetch_article("..", Some("secret")).await.unwrap(), None);
        assert_eq!(source(&url).fetch_article(".", None).await.unwrap(), None);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fail_when_unreachable() {
        let unreachable = source("http://127.0.0.1:1");

        assert!(unreachable.fetch_article("X", None).await.is_err());
    }
}
