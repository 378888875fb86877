pub mod analysis;
pub mod catalog;
pub mod error;
pub mod server;
pub mod settings;

/// Imagelens configuration defaults. Every value here can be overridden at
/// startup through `settings::Settings`
pub mod config {
    /// The OpenRouter chat-completions endpoint
    pub const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

    /// Sent as `HTTP-Referer` to identify the calling application
    pub const REFERER: &str = "http://localhost:5000";

    /// Sent as `X-Title` to identify the calling application
    pub const TITLE: &str = "Image Analyzer";

    /// Prompt used when the user leaves the prompt field empty
    pub const DEFAULT_USER_PROMPT: &str = "analyze this image in detail and explain it";

    /// Vision-capable models offered on the index page, in display order
    pub const VISION_MODELS: &[&str] = &[
        "anthropic/claude-3.5-sonnet",
        "anthropic/claude-3-opus",
        "anthropic/claude-3-sonnet",
        "anthropic/claude-3-haiku",
        "google/gemini-pro-1.5",
        "google/gemini-flash-1.5",
        "openai/gpt-4o",
        "openai/gpt-4o-mini",
        "openai/gpt-4-turbo",
        "meta-llama/llama-3.2-90b-vision-instruct",
        "meta-llama/llama-3.2-11b-vision-instruct",
        "qwen/qwen-2-vl-72b-instruct",
    ];

    /// Largest accepted multipart upload (16 MiB)
    pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

    /// Bound on the outbound chat-completion call
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;

    pub const HOST: &str = "127.0.0.1";
    pub const PORT: u16 = 5000;

    /// Settings file read from the working directory when no path is given
    pub const SETTINGS_FILE: &str = "imagelens.toml";

    /// Prefix of environment variables that override settings
    pub const ENV_PREFIX: &str = "IMAGELENS";

    /// Log filter used when `RUST_LOG` is unset
    pub const RUST_LOG: &str = "imagelens=debug,actix_web=info";
}

/// Logging setup and test fixtures
pub mod util {
    use tracing_subscriber::EnvFilter;

    /// Install the global tracing subscriber, honouring `RUST_LOG` when set
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(super::config::RUST_LOG));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    /// Shared fixtures for tests: generated images, multipart bodies and a
    /// stand-in for the remote chat-completion API
    #[cfg(test)]
    pub mod test {
        use actix_web::http::StatusCode;
        use actix_web::{web, App, HttpResponse, HttpServer};
        use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
        use serde_json::Value;
        use std::io::Cursor;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Mutex;
        use std::time::Duration;

        pub const BOUNDARY: &str = "imagelens-test-boundary";

        /// A solid red square
        pub fn red_square(side: u32) -> DynamicImage {
            DynamicImage::ImageRgb8(RgbImage::from_pixel(side, side, Rgb([255, 0, 0])))
        }

        /// A small image where every pixel differs, so re-encoding mistakes
        /// show up
        pub fn gradient(width: u32, height: u32) -> DynamicImage {
            DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
                Rgb([(x * 17) as u8, (y * 29) as u8, ((x + y) * 7) as u8])
            }))
        }

        pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
            let mut buf = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
                .unwrap();
            buf
        }

        /// One part of a multipart/form-data body
        pub enum Part<'a> {
            Text(&'a str, &'a str),
            File {
                name: &'a str,
                file_name: &'a str,
                data: &'a [u8],
            },
        }

        /// Build a multipart/form-data body delimited by `BOUNDARY`
        pub fn multipart_body(parts: &[Part]) -> Vec<u8> {
            let mut body = Vec::new();
            for part in parts {
                body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
                match part {
                    Part::Text(name, value) => {
                        body.extend_from_slice(
                            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                                .as_bytes(),
                        );
                        body.extend_from_slice(value.as_bytes());
                    }
                    Part::File {
                        name,
                        file_name,
                        data,
                    } => {
                        body.extend_from_slice(
                            format!(
                                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                                 Content-Type: application/octet-stream\r\n\r\n"
                            )
                            .as_bytes(),
                        );
                        body.extend_from_slice(data);
                    }
                }
                body.extend_from_slice(b"\r\n");
            }
            body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
            body
        }

        pub fn multipart_content_type() -> String {
            format!("multipart/form-data; boundary={BOUNDARY}")
        }

        /// Records what the stubbed API received and replays a canned reply
        pub struct StubApi {
            pub hits: AtomicUsize,
            pub last_body: Mutex<Option<Value>>,
            pub last_headers: Mutex<Vec<(String, String)>>,
            status: StatusCode,
            reply: String,
            delay: Duration,
        }

        impl StubApi {
            pub fn hits(&self) -> usize {
                self.hits.load(Ordering::SeqCst)
            }

            pub fn last_body(&self) -> Value {
                self.last_body
                    .lock()
                    .unwrap()
                    .clone()
                    .expect("stub received no request")
            }

            pub fn header(&self, name: &str) -> Option<String> {
                self.last_headers
                    .lock()
                    .unwrap()
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v.clone())
            }
        }

        async fn completions(
            stub: web::Data<StubApi>,
            req: actix_web::HttpRequest,
            body: web::Bytes,
        ) -> HttpResponse {
            stub.hits.fetch_add(1, Ordering::SeqCst);
            if !stub.delay.is_zero() {
                tokio::time::sleep(stub.delay).await;
            }
            *stub.last_body.lock().unwrap() = serde_json::from_slice(&body).ok();
            *stub.last_headers.lock().unwrap() = req
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
                .collect();

            HttpResponse::build(stub.status)
                .content_type("application/json")
                .body(stub.reply.clone())
        }

        /// Start a local chat-completion API answering every POST with
        /// `status` and `reply`. Returns its endpoint URL and the recorder
        pub async fn spawn_stub_api(status: StatusCode, reply: &str) -> (String, web::Data<StubApi>) {
            spawn_slow_stub_api(status, reply, Duration::ZERO).await
        }

        /// Like `spawn_stub_api`, but every reply is held back by `delay`
        pub async fn spawn_slow_stub_api(
            status: StatusCode,
            reply: &str,
            delay: Duration,
        ) -> (String, web::Data<StubApi>) {
            let stub = web::Data::new(StubApi {
                hits: AtomicUsize::new(0),
                last_body: Mutex::new(None),
                last_headers: Mutex::new(Vec::new()),
                status,
                reply: reply.to_string(),
                delay,
            });

            let data = stub.clone();
            let server = HttpServer::new(move || {
                App::new()
                    .app_data(data.clone())
                    .route("/api/v1/chat/completions", web::post().to(completions))
            })
            .workers(1)
            .bind(("127.0.0.1", 0))
            .unwrap();

            let addr = server.addrs()[0];
            actix_web::rt::spawn(server.run());

            (format!("http://{addr}/api/v1/chat/completions"), stub)
        }
    }
}
