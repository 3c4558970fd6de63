use bytes::BufMut;
use ipnet::Ipv4Net;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use super::types::*;

/// An IPv4 CIDR prefix as carried in withdrawn routes and NLRI.
///
/// The wrapped network is always truncated, so host bits past the prefix
/// length are zero and two prefixes compare equal iff their wire forms do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Prefix {
    net: Ipv4Net,
}

/// Returns the number of bytes needed to represent a prefix of length `plen`.
pub fn prefix_bytes(plen: u8) -> usize {
    (plen as usize).div_ceil(8)
}

impl Prefix {
    pub fn new(address: Ipv4Addr, length: u8) -> Result<Prefix, BgpValidationError> {
        let net = Ipv4Net::new(address, length)
            .map_err(|_| BgpValidationError::InvalidNlriPrefixLength(length))?;
        Ok(Prefix { net: net.trunc() })
    }

    pub fn address(&self) -> Ipv4Addr {
        self.net.network()
    }

    pub fn length(&self) -> u8 {
        self.net.prefix_len()
    }

    pub fn net(&self) -> Ipv4Net {
        self.net
    }

    /// Length byte plus the significant address bytes.
    pub fn byte_len(&self) -> usize {
        1 + prefix_bytes(self.length())
    }

    /// Decodes one prefix from the front of `src`, returning it together
    /// with the number of bytes it occupied.
    pub fn decode(src: &[u8]) -> Result<(Prefix, usize), BgpValidationError> {
        let plen = *src.first().ok_or(BgpValidationError::InvalidBufferBounds {
            offset: 0,
            length: 1,
            buffer_size: 0,
        })?;
        if plen > 32 {
            return Err(BgpValidationError::InvalidNlriPrefixLength(plen));
        }
        let blen = prefix_bytes(plen);
        let bits = safe_slice(src, 1, 1 + blen)?;
        let mut octets = [0u8; 4];
        octets[..blen].copy_from_slice(bits);
        let prefix = Prefix::new(Ipv4Addr::from(octets), plen)?;
        Ok((prefix, 1 + blen))
    }
}

impl From<Prefix> for Vec<u8> {
    fn from(val: Prefix) -> Self {
        let blen = prefix_bytes(val.length());
        let addr = val.address().octets();
        let mut buf = Vec::with_capacity(1 + blen);
        buf.put_u8(val.length());
        buf.put_slice(&addr[0..blen]);
        buf
    }
}

impl From<Ipv4Net> for Prefix {
    fn from(net: Ipv4Net) -> Self {
        Prefix { net: net.trunc() }
    }
}

impl From<Prefix> for Ipv4Net {
    fn from(val: Prefix) -> Self {
        val.net
    }
}

impl FromStr for Prefix {
    type Err = ipnet::AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Ipv4Net::from_str(s)?.into())
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.net)
    }
}

/// Encodes a prefix list back to back, as found in the withdrawn routes and
/// NLRI fields of an UPDATE.
pub fn encode_prefixes(prefixes: &[Prefix]) -> Vec<u8> {
    let mut v: Vec<u8> = Vec::with_capacity(prefixes.iter().map(Prefix::byte_len).sum());
    for p in prefixes {
        let mut b: Vec<u8> = (*p).into();
        v.append(&mut b);
    }
    v
}

/// Decodes prefixes until `src` is exhausted. A truncated trailing prefix is
/// an error.
pub fn decode_prefixes(src: &[u8]) -> Result<Vec<Prefix>, BgpValidationError> {
    let mut prefixes = vec![];
    let mut i = 0;
    while i < src.len() {
        let (prefix, used) = Prefix::decode(&src[i..]).map_err(|e| match e {
            BgpValidationError::InvalidBufferBounds { length, .. } => {
                BgpValidationError::InvalidBufferBounds {
                    offset: i,
                    length,
                    buffer_size: src.len(),
                }
            }
            other => other,
        })?;
        prefixes.push(prefix);
        i += used;
    }
    Ok(prefixes)
}
