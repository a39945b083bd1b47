//! Loading input documents and stamp images

use crate::error::{Error, Result};
use crate::source::DocumentCache;
use base64::Engine;
use futures_util::StreamExt;
use std::net::IpAddr;
use std::path::Path;

/// What the resolved bytes must be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Pdf,
    Image,
}

impl AssetKind {
    fn validate(&self, data: &[u8], origin: &str) -> Result<()> {
        match self {
            AssetKind::Pdf => {
                if data.len() < 4 || &data[0..4] != b"%PDF" {
                    return Err(Error::InvalidPdf {
                        reason: format!("{} is not a valid PDF file", origin),
                    });
                }
            }
            AssetKind::Image => {
                if image::guess_format(data).is_err() {
                    return Err(Error::InvalidStamp {
                        reason: format!("{} is not a supported image", origin),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Input bytes plus a display name for results and logs
#[derive(Debug)]
pub struct ResolvedAsset {
    pub data: Vec<u8>,
    pub name: String,
}

pub fn resolve_path<P: AsRef<Path>>(path: P, kind: AssetKind) -> Result<ResolvedAsset> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let data = std::fs::read(path)?;
    kind.validate(&data, "File")?;
    Ok(ResolvedAsset {
        data,
        name: path.display().to_string(),
    })
}

/// Decode base64, also accepting a `data:...;base64,` prefix
pub fn resolve_base64(encoded: &str, kind: AssetKind) -> Result<ResolvedAsset> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, payload)) if prefix.starts_with("data:") => payload,
        _ => encoded,
    };
    let data = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;
    kind.validate(&data, "Decoded data")?;
    Ok(ResolvedAsset {
        data,
        name: "<base64>".to_string(),
    })
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10
                || (a == 100 && (b & 0xC0) == 64)
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 and fe80::/10
                || (first & 0xFE00) == 0xFC00
                || (first & 0xFFC0) == 0xFE80
        }
    }
}

/// Refuse URLs whose host resolves to a non-public address
async fn check_ssrf(url_str: &str) -> Result<()> {
    let parsed = url::Url::parse(url_str).map_err(|e| Error::SourceResolution {
        reason: format!("Invalid URL: {}", e),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::SourceResolution {
            reason: format!("Unsupported URL scheme: {}", parsed.scheme()),
        });
    }
    let host = parsed.host_str().ok_or_else(|| Error::SourceResolution {
        reason: "URL has no host".to_string(),
    })?;
    let port = parsed.port_or_known_default().unwrap_or(443);

    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| Error::SourceResolution {
            reason: format!("DNS resolution failed for {}: {}", host, e),
        })?;

    for addr in addrs {
        if is_private_ip(&addr.ip()) {
            tracing::warn!(url = url_str, ip = %addr.ip(), "Blocked private address");
            return Err(Error::SsrfBlocked {
                url: url_str.to_string(),
            });
        }
    }
    Ok(())
}

/// Download a document or image, stopping once `max_bytes` is exceeded
pub async fn resolve_url(
    url: &str,
    kind: AssetKind,
    allow_private_urls: bool,
    max_bytes: u64,
) -> Result<ResolvedAsset> {
    if !allow_private_urls {
        check_ssrf(url).await?;
    }

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()?;
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(Error::SourceResolution {
            reason: format!("HTTP request failed with status: {}", response.status()),
        });
    }
    if let Some(length) = response.content_length() {
        if length > max_bytes {
            return Err(Error::DownloadTooLarge {
                size: length,
                max_size: max_bytes,
            });
        }
    }

    let mut data = Vec::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        data.extend_from_slice(&chunk?);
        if data.len() as u64 > max_bytes {
            return Err(Error::DownloadTooLarge {
                size: data.len() as u64,
                max_size: max_bytes,
            });
        }
    }

    kind.validate(&data, "Downloaded data")?;
    tracing::debug!(url, bytes = data.len(), "Downloaded source");
    Ok(ResolvedAsset {
        data,
        name: url.to_string(),
    })
}

/// Load an earlier tool output from the cache
pub fn resolve_cache(key: &str, cache: &DocumentCache) -> Result<ResolvedAsset> {
    let cached = cache.get(key).ok_or_else(|| Error::CacheKeyNotFound {
        key: key.to_string(),
    })?;
    Ok(ResolvedAsset {
        data: cached.data.as_ref().clone(),
        name: format!("<cache:{}>", key),
    })
}
