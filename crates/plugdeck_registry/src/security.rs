//! URL and destination-path checks applied before anything is fetched or
//! written.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use url::{Host, Url};

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),
    #[error("Access to loopback address denied: {0}")]
    LoopbackDenied(String),
    #[error("Access to private IP address denied: {0}")]
    PrivateIpDenied(String),
    #[error("Unsafe destination path: {0}")]
    UnsafePath(String),
}

enum HostClass {
    Public,
    Loopback,
    Private,
}

fn classify_v4(ip: Ipv4Addr) -> HostClass {
    if ip.is_loopback() || ip.is_unspecified() {
        HostClass::Loopback
    } else if ip.is_private() || ip.is_link_local() {
        HostClass::Private
    } else {
        HostClass::Public
    }
}

fn classify_v6(ip: Ipv6Addr) -> HostClass {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return classify_v4(mapped);
    }
    if ip.is_loopback() || ip.is_unspecified() {
        HostClass::Loopback
    } else if (ip.segments()[0] & 0xfe00) == 0xfc00 || ip.is_unicast_link_local() {
        // fc00::/7 unique local
        HostClass::Private
    } else {
        HostClass::Public
    }
}

/// Rejects non-HTTP schemes, and loopback/private hosts unless `allow_local`
/// is set.
pub fn validate_url(url: &Url, allow_local: bool) -> Result<(), SecurityError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SecurityError::InvalidScheme(url.scheme().to_string()));
    }
    if allow_local {
        return Ok(());
    }

    let class = match url.host() {
        Some(Host::Domain(domain)) if domain.eq_ignore_ascii_case("localhost") => {
            HostClass::Loopback
        }
        Some(Host::Domain(_)) | None => HostClass::Public,
        Some(Host::Ipv4(ip)) => classify_v4(ip),
        Some(Host::Ipv6(ip)) => classify_v6(ip),
    };

    let host = url.host_str().unwrap_or_default().to_string();
    match class {
        HostClass::Public => Ok(()),
        HostClass::Loopback => Err(SecurityError::LoopbackDenied(host)),
        HostClass::Private => Err(SecurityError::PrivateIpDenied(host)),
    }
}

/// Validates a download destination taken from a manifest.
///
/// The path must be relative and made only of normal components, so that
/// joining it onto the plugin root can never leave that directory.
pub fn validate_relative_path(relative: &str) -> Result<PathBuf, SecurityError> {
    let path = Path::new(relative);
    if relative.trim().is_empty() || path.has_root() {
        return Err(SecurityError::UnsafePath(relative.to_string()));
    }

    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(SecurityError::UnsafePath(relative.to_string()));
            }
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(SecurityError::UnsafePath(relative.to_string()));
    }
    Ok(clean)
}
