use std::convert::Infallible;
use std::net::SocketAddr;

use warp::Filter;

const FORWARDED_FOR: &str = "x-forwarded-for";
const UNKNOWN_VOTER: &str = "unknown";

/// Derives the voter token for a request. The proxy header wins when present and is
/// taken verbatim; it is trivially spoofable and only meant to separate casual voters.
pub fn resolve_voter(forwarded_for: Option<&str>, remote: Option<SocketAddr>) -> String {
    if let Some(header) = forwarded_for.map(str::trim).filter(|h| !h.is_empty()) {
        return header.to_string();
    }

    remote
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_VOTER.to_string())
}

pub fn voter_identity() -> impl Filter<Extract = (String,), Error = Infallible> + Clone {
    warp::header::optional::<String>(FORWARDED_FOR)
        .or(warp::any().map(|| None::<String>))
        .unify()
        .and(warp::addr::remote())
        .map(|forwarded: Option<String>, remote: Option<SocketAddr>| {
            resolve_voter(forwarded.as_deref(), remote)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_header_wins() {
        let remote: SocketAddr = "192.168.1.5:51234".parse().unwrap();
        assert_eq!(
            resolve_voter(Some("203.0.113.7, 10.0.0.1"), Some(remote)),
            "203.0.113.7, 10.0.0.1"
        );
    }

    #[test]
    fn test_blank_header_falls_back_to_remote_ip() {
        let remote: SocketAddr = "192.168.1.5:51234".parse().unwrap();
        assert_eq!(resolve_voter(Some("   "), Some(remote)), "192.168.1.5");
        assert_eq!(resolve_voter(None, Some(remote)), "192.168.1.5");
    }

    #[test]
    fn test_port_is_not_part_of_identity() {
        let a: SocketAddr = "10.1.1.1:1000".parse().unwrap();
        let b: SocketAddr = "10.1.1.1:2000".parse().unwrap();
        assert_eq!(resolve_voter(None, Some(a)), resolve_voter(None, Some(b)));
    }

    #[test]
    fn test_no_metadata_yields_unknown() {
        assert_eq!(resolve_voter(None, None), "unknown");
    }

    #[tokio::test]
    async fn test_filter_reads_header() {
        let voter = warp::test::request()
            .header("x-forwarded-for", "198.51.100.2")
            .filter(&voter_identity())
            .await
            .unwrap();
        assert_eq!(voter, "198.51.100.2");
    }

    #[tokio::test]
    async fn test_filter_reads_remote_addr() {
        let voter = warp::test::request()
            .remote_addr("127.0.0.1:9000".parse().unwrap())
            .filter(&voter_identity())
            .await
            .unwrap();
        assert_eq!(voter, "127.0.0.1");
    }
}
