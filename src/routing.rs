//! Routing targets.
//!
//! A [`Target`] names the in-cluster service a request is forwarded to.
//! Choosing the target is the proxy's business; this module only describes
//! one and turns it into an address.

use serde::Deserialize;
use url::Url;

use crate::error::Error;

/// Where intercepted traffic for one workload goes.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Target {
    /// Host the service is reachable at, e.g. `checkout.shop.svc.cluster.local`.
    pub host: String,
    pub service: String,
    pub port: u16,
    /// The deployment scaled behind the service.
    pub deployment: String,
}

impl Target {
    /// `http://<host>:<port>`.
    pub fn service_url(&self) -> Result<Url, Error> {
        Ok(Url::parse(&format!("http://{}:{}", self.host, self.port))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(host: &str, port: u16) -> Target {
        Target {
            host: host.to_owned(),
            service: "testsvc".to_owned(),
            port,
            deployment: "testdeploy".to_owned(),
        }
    }

    fn host_port(url: &Url) -> String {
        format!("{}:{}", url.host_str().unwrap(), url.port_or_known_default().unwrap())
    }

    #[test]
    fn service_url_is_host_and_port() {
        let target = target("example.com", 8081);

        let url = target.service_url().unwrap();
        assert_eq!(host_port(&url), format!("{}:{}", target.host, target.port));
        assert_eq!(url.as_str(), "http://example.com:8081/");
    }

    #[test]
    fn service_url_keeps_the_default_port_addressable() {
        let url = target("svc.local", 80).service_url().unwrap();
        assert_eq!(host_port(&url), "svc.local:80");
    }

    #[test]
    fn service_url_rejects_an_unusable_host() {
        let err = target("bad host", 8080).service_url().unwrap_err();
        assert!(matches!(err, Error::ServiceUrl(_)));
    }
}
