//! Path routing.
//!
//! Routes are an ordered table of patterns tried top to bottom against the
//! decoded path. Patterns are anchored: every segment must match and no
//! segment may be left over. `:name` captures one non-empty segment;
//! a trailing `:name?` may be absent.

use edge_cache::RouteCachePolicy;
use edge_core::RouteParams;

/// Lifetime for listings and package documents, and for every 404.
pub const LISTING_TTL_SECS: u64 = 3600;
/// Lifetime for aggregated metadata, which is refreshed often.
pub const AGGREGATED_TTL_SECS: u64 = 300;
/// Lifetime for version documents, which never change once written.
pub const IMMUTABLE_TTL_SECS: u64 = 31_536_000;

/// What a request path asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Favicon,
    Extensions,
    Packages,
    Package,
    PackageSris,
    Aggregated,
    Versions,
    Version,
    Forbidden,
}

impl Endpoint {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Favicon => "favicon",
            Self::Extensions => "extensions",
            Self::Packages => "packages",
            Self::Package => "package",
            Self::PackageSris => "sris",
            Self::Aggregated => "aggregated",
            Self::Versions => "versions",
            Self::Version => "version",
            Self::Forbidden => "forbidden",
        }
    }

    /// Whether responses for this endpoint go through the response cache.
    pub fn is_cached(&self) -> bool {
        !matches!(self, Self::Favicon | Self::Extensions | Self::Forbidden)
    }

    /// Cache policy for a response, given whether the entity was found.
    pub fn cache_policy(&self, found: bool) -> RouteCachePolicy {
        match (self, found) {
            (Self::Favicon | Self::Extensions | Self::Forbidden, _) => RouteCachePolicy::none(),
            (Self::Aggregated, true) => RouteCachePolicy::max_age_secs(AGGREGATED_TTL_SECS),
            (Self::Version, true) => RouteCachePolicy::max_age_secs(IMMUTABLE_TTL_SECS),
            _ => RouteCachePolicy::max_age_secs(LISTING_TTL_SECS),
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved request with its captured names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Favicon,
    Extensions,
    Packages,
    Package { package: String },
    PackageSris { package: String, version: Option<String> },
    Aggregated { package: String },
    Versions { package: String },
    Version { package: String, version: String },
    Forbidden,
}

impl Route {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Favicon => Endpoint::Favicon,
            Self::Extensions => Endpoint::Extensions,
            Self::Packages => Endpoint::Packages,
            Self::Package { .. } => Endpoint::Package,
            Self::PackageSris { .. } => Endpoint::PackageSris,
            Self::Aggregated { .. } => Endpoint::Aggregated,
            Self::Versions { .. } => Endpoint::Versions,
            Self::Version { .. } => Endpoint::Version,
            Self::Forbidden => Endpoint::Forbidden,
        }
    }

    fn from_params(endpoint: Endpoint, mut params: RouteParams) -> Option<Self> {
        let mut take = |name: &str| params.remove(name);
        Some(match endpoint {
            Endpoint::Favicon => Self::Favicon,
            Endpoint::Extensions => Self::Extensions,
            Endpoint::Packages => Self::Packages,
            Endpoint::Package => Self::Package {
                package: take("package")?,
            },
            Endpoint::PackageSris => Self::PackageSris {
                package: take("package")?,
                version: take("version"),
            },
            Endpoint::Aggregated => Self::Aggregated {
                package: take("package")?,
            },
            Endpoint::Versions => Self::Versions {
                package: take("package")?,
            },
            Endpoint::Version => Self::Version {
                package: take("package")?,
                version: take("version")?,
            },
            Endpoint::Forbidden => Self::Forbidden,
        })
    }
}

/// One row of the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteSpec {
    pub pattern: &'static str,
    pub endpoint: Endpoint,
}

/// Routes in match order.
pub const ROUTE_TABLE: &[RouteSpec] = &[
    RouteSpec { pattern: "/favicon.ico", endpoint: Endpoint::Favicon },
    RouteSpec { pattern: "/extensions", endpoint: Endpoint::Extensions },
    RouteSpec { pattern: "/packages", endpoint: Endpoint::Packages },
    RouteSpec { pattern: "/packages/:package", endpoint: Endpoint::Package },
    RouteSpec { pattern: "/packages/:package/sris/:version?", endpoint: Endpoint::PackageSris },
    RouteSpec { pattern: "/packages/:package/all", endpoint: Endpoint::Aggregated },
    RouteSpec { pattern: "/packages/:package/versions", endpoint: Endpoint::Versions },
    RouteSpec { pattern: "/packages/:package/versions/:version", endpoint: Endpoint::Version },
];

/// Ordered path matcher.
#[derive(Debug, Clone, Copy)]
pub struct Router {
    routes: &'static [RouteSpec],
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self { routes: ROUTE_TABLE }
    }

    /// The route table in match order.
    pub fn routes(&self) -> &'static [RouteSpec] {
        self.routes
    }

    /// Resolve a decoded path; anything unmatched is `Forbidden`.
    pub fn resolve(&self, path: &str) -> Route {
        self.routes
            .iter()
            .find_map(|spec| {
                let params = match_pattern(spec.pattern, path)?;
                Route::from_params(spec.endpoint, params)
            })
            .unwrap_or(Route::Forbidden)
    }
}

/// Match `path` against `pattern`, returning captured segments.
fn match_pattern(pattern: &str, path: &str) -> Option<RouteParams> {
    let mut params = RouteParams::new();
    let mut actual = path.split('/');

    for expected in pattern.split('/') {
        let segment = actual.next();
        match expected.strip_prefix(':') {
            Some(name) => match (name.strip_suffix('?'), segment) {
                (Some(_), None) => break,
                (_, Some(value)) if !value.is_empty() => {
                    let name = name.trim_end_matches('?');
                    params.insert(name.to_string(), value.to_string());
                }
                _ => return None,
            },
            None => {
                if segment != Some(expected) {
                    return None;
                }
            }
        }
    }

    actual.next().is_none().then_some(params)
}
