use bytes::BufMut;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::fmt;
use std::net::Ipv4Addr;

use super::types::*;

#[derive(Debug, PartialEq, Eq, Clone, Copy, FromPrimitive, PartialOrd, Ord, Hash)]
pub enum OriginType {
    Igp = 0,
    Egp,
    Incomplete,
}

#[derive(Debug, Eq, Clone, Copy, FromPrimitive, PartialEq, Hash)]
pub enum ASPATHSegmentType {
    AsSet = 1,
    AsSequence,
}

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct ASPATHSegment {
    pub segment_type: ASPATHSegmentType,
    pub as_list: Vec<u16>,
}

impl ASPATHSegment {
    pub fn len(&self) -> usize {
        match &self.segment_type {
            ASPATHSegmentType::AsSequence => self.as_list.len(),
            ASPATHSegmentType::AsSet => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_list.is_empty()
    }

    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), BgpValidationError> {
        let count = u8::try_from(self.as_list.len()).map_err(|_| {
            BgpValidationError::MalformedAsPath(format!(
                "segment of {} AS numbers does not fit a one byte count",
                self.as_list.len()
            ))
        })?;
        buf.put_u8(self.segment_type as u8);
        buf.put_u8(count);
        for asn in &self.as_list {
            buf.put_u16(*asn);
        }
        Ok(())
    }
}

pub type Aspath = Vec<ASPATHSegment>;

pub trait Flatten {
    fn flatten_aspath(&self) -> Vec<u16>;
}

impl Flatten for Aspath {
    fn flatten_aspath(&self) -> Vec<u16> {
        let mut v: Vec<u16> = vec![];
        for segment in self {
            v.extend_from_slice(&segment.as_list);
        }
        v
    }
}

fn decode_aspath(src: &[u8]) -> Result<Aspath, BgpValidationError> {
    let mut asp: Aspath = vec![];
    let mut offset = 0;
    while offset < src.len() {
        let [kind, count] = safe_array::<2>(src, offset).map_err(|_| {
            BgpValidationError::MalformedAsPath(format!("truncated segment header at {}", offset))
        })?;
        let segment_type: ASPATHSegmentType = FromPrimitive::from_u8(kind).ok_or_else(|| {
            BgpValidationError::MalformedAsPath(format!("unknown segment type {}", kind))
        })?;
        let start = offset + 2;
        let end = start + 2 * count as usize;
        let asns = safe_slice(src, start, end).map_err(|_| {
            BgpValidationError::MalformedAsPath(format!(
                "segment announces {} AS numbers but only {} bytes remain",
                count,
                src.len() - start
            ))
        })?;
        let as_list = asns
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        asp.push(ASPATHSegment {
            segment_type,
            as_list,
        });
        offset = end;
    }
    Ok(asp)
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct AggregatorValue {
    pub last_as: u16,
    pub aggregator: Ipv4Addr,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Community {
    pub asn: u16,
    pub value: u16,
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.asn, self.value)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, FromPrimitive, Copy)]
pub enum PathAttributeType {
    Origin = 1,
    AsPath,
    NextHop,
    MultiExitDisc,
    LocalPref,
    AtomicAggregate,
    Aggregator,
    Communities,
    OriginatorId,
    ClusterList,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum PathAttributeValue {
    Origin(OriginType),
    AsPath(Aspath),
    NextHop(Ipv4Addr),
    MultiExitDisc(u32),
    LocalPref(u32),
    AtomicAggregate,
    Aggregator(AggregatorValue),
    Communities(Vec<Community>),
    OriginatorId(Ipv4Addr),
    ClusterList(Vec<Ipv4Addr>),
    /// Attribute types this speaker does not interpret, kept verbatim.
    Unknown { type_code: u8, data: Vec<u8> },
}

fn expect_len(type_code: u8, src: &[u8], expected: usize) -> Result<(), BgpValidationError> {
    if src.len() != expected {
        return Err(BgpValidationError::InvalidPathAttributeLength {
            type_code,
            length: src.len(),
        });
    }
    Ok(())
}

fn ipv4_list(type_code: u8, src: &[u8]) -> Result<Vec<Ipv4Addr>, BgpValidationError> {
    if src.len() % 4 != 0 {
        return Err(BgpValidationError::InvalidPathAttributeLength {
            type_code,
            length: src.len(),
        });
    }
    Ok(src
        .chunks_exact(4)
        .map(|c| Ipv4Addr::new(c[0], c[1], c[2], c[3]))
        .collect())
}

impl PathAttributeValue {
    pub fn type_code(&self) -> u8 {
        match self {
            PathAttributeValue::Origin(_) => PathAttributeType::Origin as u8,
            PathAttributeValue::AsPath(_) => PathAttributeType::AsPath as u8,
            PathAttributeValue::NextHop(_) => PathAttributeType::NextHop as u8,
            PathAttributeValue::MultiExitDisc(_) => PathAttributeType::MultiExitDisc as u8,
            PathAttributeValue::LocalPref(_) => PathAttributeType::LocalPref as u8,
            PathAttributeValue::AtomicAggregate => PathAttributeType::AtomicAggregate as u8,
            PathAttributeValue::Aggregator(_) => PathAttributeType::Aggregator as u8,
            PathAttributeValue::Communities(_) => PathAttributeType::Communities as u8,
            PathAttributeValue::OriginatorId(_) => PathAttributeType::OriginatorId as u8,
            PathAttributeValue::ClusterList(_) => PathAttributeType::ClusterList as u8,
            PathAttributeValue::Unknown { type_code, .. } => *type_code,
        }
    }

    /// Interprets the value bytes of an attribute of the given type.
    pub fn decode(type_code: u8, src: &[u8]) -> Result<PathAttributeValue, BgpValidationError> {
        let kind: PathAttributeType = match FromPrimitive::from_u8(type_code) {
            Some(kind) => kind,
            None => {
                log::warn!(
                    "unknown path attribute type_code: {} ({} bytes kept)",
                    type_code,
                    src.len()
                );
                return Ok(PathAttributeValue::Unknown {
                    type_code,
                    data: src.to_vec(),
                });
            }
        };

        let value = match kind {
            PathAttributeType::Origin => {
                expect_len(type_code, src, 1)?;
                let origin: OriginType = FromPrimitive::from_u8(src[0])
                    .ok_or(BgpValidationError::InvalidOrigin(src[0]))?;
                PathAttributeValue::Origin(origin)
            }
            PathAttributeType::AsPath => PathAttributeValue::AsPath(decode_aspath(src)?),
            PathAttributeType::NextHop => {
                expect_len(type_code, src, 4)?;
                PathAttributeValue::NextHop(Ipv4Addr::from(safe_array::<4>(src, 0)?))
            }
            PathAttributeType::MultiExitDisc => {
                expect_len(type_code, src, 4)?;
                PathAttributeValue::MultiExitDisc(u32::from_be_bytes(safe_array(src, 0)?))
            }
            PathAttributeType::LocalPref => {
                expect_len(type_code, src, 4)?;
                PathAttributeValue::LocalPref(u32::from_be_bytes(safe_array(src, 0)?))
            }
            PathAttributeType::AtomicAggregate => {
                expect_len(type_code, src, 0)?;
                PathAttributeValue::AtomicAggregate
            }
            PathAttributeType::Aggregator => {
                expect_len(type_code, src, 6)?;
                PathAttributeValue::Aggregator(AggregatorValue {
                    last_as: u16::from_be_bytes(safe_array(src, 0)?),
                    aggregator: Ipv4Addr::from(safe_array::<4>(src, 2)?),
                })
            }
            PathAttributeType::Communities => {
                if src.len() % 4 != 0 {
                    return Err(BgpValidationError::InvalidPathAttributeLength {
                        type_code,
                        length: src.len(),
                    });
                }
                let communities = src
                    .chunks_exact(4)
                    .map(|c| Community {
                        asn: u16::from_be_bytes([c[0], c[1]]),
                        value: u16::from_be_bytes([c[2], c[3]]),
                    })
                    .collect();
                PathAttributeValue::Communities(communities)
            }
            PathAttributeType::OriginatorId => {
                expect_len(type_code, src, 4)?;
                PathAttributeValue::OriginatorId(Ipv4Addr::from(safe_array::<4>(src, 0)?))
            }
            PathAttributeType::ClusterList => {
                PathAttributeValue::ClusterList(ipv4_list(type_code, src)?)
            }
        };
        Ok(value)
    }

    /// The value bytes, without flags, type or length.
    pub fn encode(&self) -> Result<Vec<u8>, BgpValidationError> {
        let mut buf: Vec<u8> = vec![];
        match self {
            PathAttributeValue::Origin(value) => buf.put_u8(*value as u8),
            PathAttributeValue::AsPath(value) => {
                for segment in value {
                    segment.encode_into(&mut buf)?;
                }
            }
            PathAttributeValue::NextHop(value) => buf.put_slice(&value.octets()),
            PathAttributeValue::MultiExitDisc(value) => buf.put_u32(*value),
            PathAttributeValue::LocalPref(value) => buf.put_u32(*value),
            PathAttributeValue::AtomicAggregate => {}
            PathAttributeValue::Aggregator(value) => {
                buf.put_u16(value.last_as);
                buf.put_slice(&value.aggregator.octets());
            }
            PathAttributeValue::Communities(value) => {
                for c in value {
                    buf.put_u16(c.asn);
                    buf.put_u16(c.value);
                }
            }
            PathAttributeValue::OriginatorId(value) => buf.put_slice(&value.octets()),
            PathAttributeValue::ClusterList(value) => {
                for id in value {
                    buf.put_slice(&id.octets());
                }
            }
            PathAttributeValue::Unknown { data, .. } => buf.put_slice(data),
        }
        Ok(buf)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PathAttribute {
    pub flags: u8,
    pub value: PathAttributeValue,
}

impl PathAttribute {
    pub fn new(flags: u8, value: PathAttributeValue) -> Self {
        PathAttribute { flags, value }
    }

    pub fn origin(origin: OriginType) -> Self {
        Self::new(ATTR_FLAG_TRANSITIVE, PathAttributeValue::Origin(origin))
    }

    pub fn aspath(aspath: Aspath) -> Self {
        Self::new(ATTR_FLAG_TRANSITIVE, PathAttributeValue::AsPath(aspath))
    }

    pub fn nexthop(nh: Ipv4Addr) -> Self {
        Self::new(ATTR_FLAG_TRANSITIVE, PathAttributeValue::NextHop(nh))
    }

    pub fn med(med: u32) -> Self {
        Self::new(ATTR_FLAG_OPTIONAL, PathAttributeValue::MultiExitDisc(med))
    }

    pub fn local_pref(pref: u32) -> Self {
        Self::new(ATTR_FLAG_TRANSITIVE, PathAttributeValue::LocalPref(pref))
    }

    pub fn atomic_aggregate() -> Self {
        Self::new(ATTR_FLAG_TRANSITIVE, PathAttributeValue::AtomicAggregate)
    }

    pub fn aggregator(last_as: u16, aggregator: Ipv4Addr) -> Self {
        Self::new(
            ATTR_FLAG_OPTIONAL | ATTR_FLAG_TRANSITIVE,
            PathAttributeValue::Aggregator(AggregatorValue {
                last_as,
                aggregator,
            }),
        )
    }

    pub fn communities(communities: Vec<Community>) -> Self {
        Self::new(
            ATTR_FLAG_OPTIONAL | ATTR_FLAG_TRANSITIVE,
            PathAttributeValue::Communities(communities),
        )
    }

    pub fn originator_id(id: Ipv4Addr) -> Self {
        Self::new(ATTR_FLAG_OPTIONAL, PathAttributeValue::OriginatorId(id))
    }

    pub fn cluster_list(ids: Vec<Ipv4Addr>) -> Self {
        Self::new(ATTR_FLAG_OPTIONAL, PathAttributeValue::ClusterList(ids))
    }

    pub fn type_code(&self) -> u8 {
        self.value.type_code()
    }

    /// `None` for attribute types kept as opaque data.
    pub fn attribute_type(&self) -> Option<PathAttributeType> {
        FromPrimitive::from_u8(self.type_code())
    }

    pub fn is_extended_length(&self) -> bool {
        is_extended_len(self.flags)
    }

    /// Decodes one attribute from the front of `src`, returning it with the
    /// number of bytes consumed.
    pub fn decode(src: &[u8]) -> Result<(PathAttribute, usize), BgpValidationError> {
        let [flags, type_code] = safe_array::<2>(src, 0)?;
        let (length, header) = match is_extended_len(flags) {
            false => (safe_array::<1>(src, 2)?[0] as usize, 3),
            true => (u16::from_be_bytes(safe_array(src, 2)?) as usize, 4),
        };
        let data = safe_slice(src, header, header + length)?;
        let value = PathAttributeValue::decode(type_code, data)?;
        Ok((PathAttribute { flags, value }, header + length))
    }

    pub fn encode(&self) -> Result<Vec<u8>, BgpValidationError> {
        let value = self.value.encode()?;
        let type_code = self.type_code();
        let mut buf: Vec<u8> = Vec::with_capacity(value.len() + 4);
        buf.put_u8(self.flags);
        buf.put_u8(type_code);
        if self.is_extended_length() {
            let len = u16::try_from(value.len()).map_err(|_| {
                BgpValidationError::PathAttributeTooLong {
                    type_code,
                    length: value.len(),
                }
            })?;
            buf.put_u16(len);
        } else {
            let len = u8::try_from(value.len()).map_err(|_| {
                BgpValidationError::PathAttributeTooLong {
                    type_code,
                    length: value.len(),
                }
            })?;
            buf.put_u8(len);
        }
        buf.put_slice(&value);
        Ok(buf)
    }
}

/// Walks a path attribute region until it is exhausted.
pub fn decode_attributes(src: &[u8]) -> Result<Vec<PathAttribute>, BgpValidationError> {
    let mut pa: Vec<PathAttribute> = vec![];
    let mut i = 0;
    while i < src.len() {
        let (attribute, used) = PathAttribute::decode(&src[i..])?;
        pa.push(attribute);
        i += used;
    }
    Ok(pa)
}

pub fn encode_attributes(attributes: &[PathAttribute]) -> Result<Vec<u8>, BgpValidationError> {
    let mut buf: Vec<u8> = vec![];
    for a in attributes {
        let mut v = a.encode()?;
        buf.append(&mut v);
    }
    Ok(buf)
}
