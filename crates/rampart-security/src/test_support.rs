//! Request fixtures for unit tests.

use salvo::Request;

#[expect(clippy::expect_used, reason = "fixtures use static, valid values")]
pub fn request(path: &str, headers: &[(&'static str, &str)]) -> Request {
    let mut req = Request::new();
    *req.uri_mut() = path.parse().expect("valid request path");
    for (name, value) in headers {
        req.headers_mut()
            .insert(*name, value.parse().expect("valid header value"));
    }
    req
}
