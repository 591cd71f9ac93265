//! CMS backend environment selection.
//!
//! The legacy CMS runs as several backend pools (`cin2`..`cin5` plus the
//! default pool). Each pool is pinned through a load-balancer affinity
//! cookie, so switching pools must also expire the affinity cookies of every
//! other pool or the load balancer keeps routing to the old one.

pub mod rewrite;

use std::fmt;
use std::str::FromStr;

use crate::context::parse_cookies;

/// Cookie naming the currently selected environment.
pub const SELECTOR_COOKIE: &str = "cms_env";

/// Backend pool of the legacy CMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmsEnvironment {
    Default,
    Cin2,
    Cin3,
    Cin4,
    Cin5,
}

/// Static per-environment wire data.
#[derive(Debug)]
pub struct EnvironmentProfile {
    /// Marker used in the selector cookie and in CMS session cookie values.
    pub marker: &'static str,
    /// Affinity cookie families issued by the load balancer for this pool.
    pub affinity_cookies: [&'static str; 2],
}

const DEFAULT_PROFILE: EnvironmentProfile = EnvironmentProfile {
    marker: "cin1",
    affinity_cookies: ["AWSALB_CIN1", "AWSALBCORS_CIN1"],
};
const CIN2_PROFILE: EnvironmentProfile = EnvironmentProfile {
    marker: "cin2",
    affinity_cookies: ["AWSALB_CIN2", "AWSALBCORS_CIN2"],
};
const CIN3_PROFILE: EnvironmentProfile = EnvironmentProfile {
    marker: "cin3",
    affinity_cookies: ["AWSALB_CIN3", "AWSALBCORS_CIN3"],
};
const CIN4_PROFILE: EnvironmentProfile = EnvironmentProfile {
    marker: "cin4",
    affinity_cookies: ["AWSALB_CIN4", "AWSALBCORS_CIN4"],
};
const CIN5_PROFILE: EnvironmentProfile = EnvironmentProfile {
    marker: "cin5",
    affinity_cookies: ["AWSALB_CIN5", "AWSALBCORS_CIN5"],
};

impl CmsEnvironment {
    pub const ALL: [CmsEnvironment; 5] = [
        CmsEnvironment::Default,
        CmsEnvironment::Cin2,
        CmsEnvironment::Cin3,
        CmsEnvironment::Cin4,
        CmsEnvironment::Cin5,
    ];

    /// Non-default environments, in the order markers are scanned.
    const SCAN_ORDER: [CmsEnvironment; 4] = [
        CmsEnvironment::Cin2,
        CmsEnvironment::Cin3,
        CmsEnvironment::Cin4,
        CmsEnvironment::Cin5,
    ];

    pub fn profile(self) -> &'static EnvironmentProfile {
        match self {
            CmsEnvironment::Default => &DEFAULT_PROFILE,
            CmsEnvironment::Cin2 => &CIN2_PROFILE,
            CmsEnvironment::Cin3 => &CIN3_PROFILE,
            CmsEnvironment::Cin4 => &CIN4_PROFILE,
            CmsEnvironment::Cin5 => &CIN5_PROFILE,
        }
    }

    /// Name used in JSON responses and route parameters.
    pub fn name(self) -> &'static str {
        match self {
            CmsEnvironment::Default => "default",
            other => other.profile().marker,
        }
    }

    /// Marker written to the selector cookie.
    pub fn wire_marker(self) -> &'static str {
        self.profile().marker
    }
}

impl fmt::Display for CmsEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown CMS environment: {0}")]
pub struct UnknownEnvironment(pub String);

impl FromStr for CmsEnvironment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        if normalized == "default" {
            return Ok(CmsEnvironment::Default);
        }
        CmsEnvironment::ALL
            .into_iter()
            .find(|env| env.profile().marker == normalized)
            .ok_or_else(|| UnknownEnvironment(s.to_string()))
    }
}

/// Upstream host per environment.
#[derive(Debug, Clone, Default)]
pub struct CmsUpstreams {
    pub default: Option<String>,
    pub cin2: Option<String>,
    pub cin3: Option<String>,
    pub cin4: Option<String>,
    pub cin5: Option<String>,
}

impl CmsUpstreams {
    pub fn host(&self, env: CmsEnvironment) -> Option<&str> {
        match env {
            CmsEnvironment::Default => self.default.as_deref(),
            CmsEnvironment::Cin2 => self.cin2.as_deref(),
            CmsEnvironment::Cin3 => self.cin3.as_deref(),
            CmsEnvironment::Cin4 => self.cin4.as_deref(),
            CmsEnvironment::Cin5 => self.cin5.as_deref(),
        }
    }

    /// All configured hosts, for body rewriting.
    pub fn configured_hosts(&self) -> impl Iterator<Item = &str> {
        CmsEnvironment::ALL
            .into_iter()
            .filter_map(move |env| self.host(env))
    }
}

/// Resolve the environment a request is bound to from its `Cookie` header.
///
/// The selector cookie wins. Without it, cookie values (never names, since
/// affinity cookie names embed every marker) are scanned for `cin2`..`cin5`.
pub fn resolve_environment(cookie_header: &str) -> CmsEnvironment {
    let cookies = parse_cookies(cookie_header);

    if let Some((_, value)) = cookies.iter().find(|(name, _)| *name == SELECTOR_COOKIE)
        && let Ok(env) = value.parse::<CmsEnvironment>()
    {
        return env;
    }

    CmsEnvironment::SCAN_ORDER
        .into_iter()
        .find(|env| {
            let marker = env.profile().marker;
            cookies.iter().any(|(_, value)| value.contains(marker))
        })
        .unwrap_or(CmsEnvironment::Default)
}

/// `Set-Cookie` values that move the browser onto `target`.
///
/// The first entry is the selector cookie; the rest expire both affinity
/// cookie families of every other environment.
pub fn switch_environment(target: CmsEnvironment) -> Vec<String> {
    let mut cookies = vec![format!(
        "{}={}; Path=/; Secure; SameSite=None",
        SELECTOR_COOKIE,
        target.wire_marker()
    )];

    for env in CmsEnvironment::ALL.into_iter().filter(|env| *env != target) {
        for name in env.profile().affinity_cookies {
            cookies.push(expire_cookie(name));
        }
    }

    cookies
}

fn expire_cookie(name: &str) -> String {
    format!("{name}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Secure; SameSite=None")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_no_cookies_is_default() {
        assert_eq!(resolve_environment(""), CmsEnvironment::Default);
        assert_eq!(resolve_environment("foo=bar"), CmsEnvironment::Default);
    }

    #[test]
    fn test_resolve_marker_in_session_value() {
        assert_eq!(
            resolve_environment("JSESSIONID=abc123.cin4; other=1"),
            CmsEnvironment::Cin4
        );
    }

    #[test]
    fn test_resolve_first_marker_wins() {
        assert_eq!(
            resolve_environment("a=node-cin5; b=node-cin3"),
            CmsEnvironment::Cin3
        );
    }

    #[test]
    fn test_resolve_selector_cookie_wins() {
        assert_eq!(
            resolve_environment("JSESSIONID=abc.cin2; cms_env=cin5"),
            CmsEnvironment::Cin5
        );
        assert_eq!(
            resolve_environment("JSESSIONID=abc.cin2; cms_env=cin1"),
            CmsEnvironment::Default
        );
    }

    #[test]
    fn test_resolve_ignores_affinity_cookie_names() {
        assert_eq!(
            resolve_environment("AWSALB_CIN2=xyz; AWSALB_cin3=abc"),
            CmsEnvironment::Default
        );
    }

    #[test]
    fn test_resolve_bogus_selector_falls_back_to_scan() {
        assert_eq!(
            resolve_environment("cms_env=nope; JSESSIONID=x.cin3"),
            CmsEnvironment::Cin3
        );
    }

    #[test]
    fn test_parse_names_and_markers() {
        assert_eq!("default".parse::<CmsEnvironment>().unwrap(), CmsEnvironment::Default);
        assert_eq!("cin1".parse::<CmsEnvironment>().unwrap(), CmsEnvironment::Default);
        assert_eq!("CIN3".parse::<CmsEnvironment>().unwrap(), CmsEnvironment::Cin3);
        assert!("cin9".parse::<CmsEnvironment>().is_err());
    }

    #[test]
    fn test_switch_sets_selector_with_canonical_default_marker() {
        let cookies = switch_environment(CmsEnvironment::Default);
        assert!(cookies[0].starts_with("cms_env=cin1;"));
        assert!(cookies[0].contains("Secure"));
    }

    #[test]
    fn test_switch_expires_other_affinity_cookies() {
        let cookies = switch_environment(CmsEnvironment::Cin3);
        assert!(cookies[0].starts_with("cms_env=cin3;"));
        // selector + 4 other environments * 2 families
        assert_eq!(cookies.len(), 9);
        assert!(cookies.iter().any(|c| c.starts_with("AWSALB_CIN2=;")));
        assert!(cookies.iter().any(|c| c.starts_with("AWSALBCORS_CIN1=;")));
        assert!(!cookies.iter().any(|c| c.starts_with("AWSALB_CIN3=")));
        assert!(!cookies.iter().any(|c| c.starts_with("AWSALBCORS_CIN3=")));
        for expired in &cookies[1..] {
            assert!(expired.contains("Max-Age=0"));
        }
    }

    #[test]
    fn test_upstream_lookup_is_per_environment() {
        let upstreams = CmsUpstreams {
            default: Some("cms.internal".into()),
            cin4: Some("cms-cin4.internal".into()),
            ..Default::default()
        };
        assert_eq!(upstreams.host(CmsEnvironment::Default), Some("cms.internal"));
        assert_eq!(upstreams.host(CmsEnvironment::Cin4), Some("cms-cin4.internal"));
        assert_eq!(upstreams.host(CmsEnvironment::Cin2), None);
        assert_eq!(upstreams.configured_hosts().count(), 2);
    }
}
