//! Conversions between wire messages and the domain model.
//!
//! Addresses travel as their textual form. An empty string means "not set" and
//! decodes to `None`; anything else must parse or the conversion fails.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::IpNet;

use super::types::*;
use crate::errors::{Error, InvalidEnumError, ParseError};
use crate::proto;

// =============================================================================
// Addresses and prefixes
// =============================================================================

/// Decode a textual address field.
pub fn decode_addr(field: &'static str, raw: &[u8]) -> Result<Option<IpAddr>, ParseError> {
    if raw.is_empty() {
        return Ok(None);
    }
    let text = std::str::from_utf8(raw)
        .map_err(|_| ParseError::new(field, String::from_utf8_lossy(raw)))?;
    text.parse::<IpAddr>()
        .map(Some)
        .map_err(|_| ParseError::new(field, text))
}

/// Decode an optional `IpAddress` message; a missing message is "not set".
pub fn decode_ip_address(
    field: &'static str,
    addr: Option<&proto::IpAddress>,
) -> Result<Option<IpAddr>, ParseError> {
    match addr {
        Some(a) => decode_addr(field, &a.address),
        None => Ok(None),
    }
}

pub fn ip_version_of(addr: &IpAddr) -> proto::IpVersion {
    match addr {
        IpAddr::V4(_) => proto::IpVersion::Ipv4,
        IpAddr::V6(_) => proto::IpVersion::Ipv6,
    }
}

pub fn encode_addr(addr: &IpAddr) -> proto::IpAddress {
    proto::IpAddress {
        ipver: ip_version_of(addr) as i32,
        address: addr.to_string().into_bytes(),
    }
}

/// Textual form of an optional address, empty when not set.
pub fn encode_opt_addr(addr: Option<&IpAddr>) -> Vec<u8> {
    addr.map(|a| a.to_string().into_bytes()).unwrap_or_default()
}

/// Decode a prefix. A missing or empty address is "not set"; a length the
/// address family cannot hold is a parse error.
pub fn decode_prefix(field: &'static str, prefix: &proto::Prefix) -> Result<Option<IpNet>, ParseError> {
    let Some(addr) = decode_ip_address(field, prefix.ip.as_ref())? else {
        return Ok(None);
    };
    let invalid = || ParseError::new(field, format!("{}/{}", addr, prefix.length));
    let len = u8::try_from(prefix.length).map_err(|_| invalid())?;
    IpNet::new(addr, len).map(Some).map_err(|_| invalid())
}

pub fn encode_prefix(net: &IpNet) -> proto::Prefix {
    proto::Prefix {
        ip: Some(encode_addr(&net.addr())),
        length: u32::from(net.prefix_len()),
        underlay_route: Vec::new(),
    }
}

fn unspecified(ipver: IpVersion) -> IpAddr {
    match ipver {
        IpVersion::Ipv4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpVersion::Ipv6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    }
}

// =============================================================================
// Status
// =============================================================================

impl From<proto::Status> for Status {
    fn from(s: proto::Status) -> Self {
        Status {
            code: s.code,
            message: s.message,
        }
    }
}

/// Copy the embedded status; a missing status reads as success.
pub fn status_of(status: Option<&proto::Status>) -> Status {
    status.cloned().map(Status::from).unwrap_or_default()
}

// =============================================================================
// Interfaces
// =============================================================================

impl From<proto::VirtualFunction> for VirtualFunction {
    fn from(vf: proto::VirtualFunction) -> Self {
        VirtualFunction {
            name: vf.name,
            domain: vf.domain,
            bus: vf.bus,
            slot: vf.slot,
            function: vf.function,
        }
    }
}

pub fn interface_from_proto(iface: &proto::Interface) -> Result<Interface, ParseError> {
    let mut ips = Vec::new();
    if let Some(ip) = decode_addr("primary_ipv4", &iface.primary_ipv4)? {
        ips.push(ip);
    }
    if let Some(ip) = decode_addr("primary_ipv6", &iface.primary_ipv6)? {
        ips.push(ip);
    }

    Ok(Interface {
        metadata: InterfaceMeta {
            id: String::from_utf8_lossy(&iface.id).into_owned(),
        },
        spec: InterfaceSpec {
            vni: iface.vni,
            device: iface.pci_name.clone(),
            ips,
            underlay_route: decode_addr("underlay_route", &iface.underlay_route)?,
            ..Default::default()
        },
        ..Default::default()
    })
}

fn ip_config(addr: Option<&IpAddr>, pxe: Option<&proto::PxeConfig>) -> Option<proto::IpConfig> {
    addr.map(|a| proto::IpConfig {
        ipver: ip_version_of(a) as i32,
        primary_address: a.to_string().into_bytes(),
        pxe_config: pxe.cloned(),
    })
}

pub fn create_interface_request(iface: &Interface) -> proto::CreateInterfaceRequest {
    let ipv4 = iface.spec.ips.iter().find(|ip| ip.is_ipv4());
    let ipv6 = iface.spec.ips.iter().find(|ip| ip.is_ipv6());
    let pxe = iface
        .spec
        .pxe
        .as_ref()
        .filter(|p| !p.server.is_empty() && !p.file_name.is_empty())
        .map(|p| proto::PxeConfig {
            next_server: p.server.clone(),
            boot_filename: p.file_name.clone(),
        });

    proto::CreateInterfaceRequest {
        interface_type: proto::InterfaceType::VirtualInterface as i32,
        interface_id: iface.metadata.id.clone().into_bytes(),
        vni: iface.spec.vni,
        ipv4_config: ip_config(ipv4, pxe.as_ref()),
        ipv6_config: ip_config(ipv6, pxe.as_ref()),
        device_name: iface.spec.device.clone(),
    }
}

// =============================================================================
// Prefixes, virtual IPs, routes
// =============================================================================

pub fn prefix_spec_from_proto(prefix: &proto::Prefix) -> Result<PrefixSpec, ParseError> {
    Ok(PrefixSpec {
        prefix: decode_prefix("prefix", prefix)?,
        underlay_route: decode_addr("underlay_route", &prefix.underlay_route)?,
    })
}

pub fn virtual_ip_from_proto(
    interface_id: &str,
    res: &proto::GetVipResponse,
) -> Result<VirtualIp, ParseError> {
    Ok(VirtualIp {
        metadata: InterfaceScope {
            interface_id: interface_id.to_string(),
        },
        spec: VirtualIpSpec {
            ip: decode_ip_address("vip_ip", res.vip_ip.as_ref())?,
            underlay_route: decode_addr("underlay_route", &res.underlay_route)?,
        },
        status: status_of(res.status.as_ref()),
        ..Default::default()
    })
}

/// Weight sent with every route.
pub const DEFAULT_ROUTE_WEIGHT: u32 = 100;

pub fn route_to_proto(spec: &RouteSpec) -> proto::Route {
    proto::Route {
        prefix: spec.prefix.as_ref().map(encode_prefix),
        nexthop_vni: spec.next_hop.vni,
        nexthop_address: spec.next_hop.ip.as_ref().map(encode_addr),
        weight: DEFAULT_ROUTE_WEIGHT,
    }
}

pub fn route_from_proto(vni: u32, route: &proto::Route) -> Result<Route, ParseError> {
    let prefix = match &route.prefix {
        Some(p) => decode_prefix("prefix", p)?,
        None => None,
    };

    Ok(Route {
        metadata: RouteMeta { vni },
        spec: RouteSpec {
            prefix,
            next_hop: RouteNextHop {
                vni: route.nexthop_vni,
                ip: decode_ip_address("nexthop_address", route.nexthop_address.as_ref())?,
            },
        },
        ..Default::default()
    })
}

// =============================================================================
// Load balancers
// =============================================================================

fn invalid_protocol(code: impl ToString) -> InvalidEnumError {
    InvalidEnumError::new("protocol", code.to_string(), LbPort::PROTOCOLS)
}

impl TryFrom<&LbPort> for proto::LbPort {
    type Error = InvalidEnumError;

    fn try_from(p: &LbPort) -> Result<Self, Self::Error> {
        let protocol = i32::try_from(p.protocol)
            .ok()
            .and_then(|code| proto::Protocol::try_from(code).ok())
            .ok_or_else(|| invalid_protocol(p.protocol))?;
        Ok(proto::LbPort {
            port: p.port,
            protocol: protocol as i32,
        })
    }
}

impl TryFrom<&proto::LbPort> for LbPort {
    type Error = InvalidEnumError;

    fn try_from(p: &proto::LbPort) -> Result<Self, Self::Error> {
        let protocol = proto::Protocol::try_from(p.protocol).map_err(|_| invalid_protocol(p.protocol))?;
        Ok(LbPort {
            protocol: protocol as u32,
            port: p.port,
        })
    }
}

pub fn load_balancer_from_proto(id: &str, res: &proto::GetLoadBalancerResponse) -> Result<LoadBalancer, Error> {
    let lbports = res
        .loadbalanced_ports
        .iter()
        .map(LbPort::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LoadBalancer {
        metadata: LoadBalancerMeta { id: id.to_string() },
        spec: LoadBalancerSpec {
            vni: res.vni,
            lb_vip_ip: decode_ip_address("loadbalanced_ip", res.loadbalanced_ip.as_ref())?,
            lbports,
            underlay_route: decode_addr("underlay_route", &res.underlay_route)?,
        },
        status: status_of(res.status.as_ref()),
        ..Default::default()
    })
}

/// Fails if a port carries a protocol number the service does not know.
pub fn create_load_balancer_request(lb: &LoadBalancer) -> Result<proto::CreateLoadBalancerRequest, InvalidEnumError> {
    Ok(proto::CreateLoadBalancerRequest {
        loadbalancer_id: lb.metadata.id.clone().into_bytes(),
        vni: lb.spec.vni,
        loadbalanced_ip: lb.spec.lb_vip_ip.as_ref().map(encode_addr),
        loadbalanced_ports: lb
            .spec
            .lbports
            .iter()
            .map(proto::LbPort::try_from)
            .collect::<Result<Vec<_>, _>>()?,
    })
}

// =============================================================================
// NAT
// =============================================================================

pub fn nat_from_proto(interface_id: &str, res: &proto::GetNatResponse) -> Result<Nat, ParseError> {
    Ok(Nat {
        metadata: NatMeta {
            interface_id: interface_id.to_string(),
        },
        spec: NatSpec {
            nat_ip: decode_ip_address("nat_ip", res.nat_ip.as_ref())?,
            min_port: res.min_port,
            max_port: res.max_port,
            underlay_route: decode_addr("underlay_route", &res.underlay_route)?,
            vni: res.vni,
        },
        status: status_of(res.status.as_ref()),
        ..Default::default()
    })
}

/// One entry of a NAT info response.
///
/// The wire uses one message for both variants; an entry with an underlay
/// route is a local translation and belongs to the queried VIP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NatInfoEntry {
    Local {
        nat_ip: IpAddr,
        underlay_route: IpAddr,
        min_port: u32,
        max_port: u32,
        vni: u32,
    },
    Neighbor {
        min_port: u32,
        max_port: u32,
        vni: u32,
    },
}

impl NatInfoEntry {
    pub fn from_proto(vip: IpAddr, entry: &proto::NatInfoEntry) -> Result<Self, ParseError> {
        Ok(match decode_addr("underlay_route", &entry.underlay_route)? {
            Some(underlay_route) => NatInfoEntry::Local {
                nat_ip: vip,
                underlay_route,
                min_port: entry.min_port,
                max_port: entry.max_port,
                vni: entry.vni,
            },
            None => NatInfoEntry::Neighbor {
                min_port: entry.min_port,
                max_port: entry.max_port,
                vni: entry.vni,
            },
        })
    }
}

impl From<NatInfoEntry> for Nat {
    fn from(entry: NatInfoEntry) -> Self {
        let spec = match entry {
            NatInfoEntry::Local {
                nat_ip,
                underlay_route,
                min_port,
                max_port,
                vni,
            } => NatSpec {
                nat_ip: Some(nat_ip),
                min_port,
                max_port,
                underlay_route: Some(underlay_route),
                vni,
            },
            NatInfoEntry::Neighbor {
                min_port,
                max_port,
                vni,
            } => NatSpec {
                min_port,
                max_port,
                vni,
                ..Default::default()
            },
        };
        Nat {
            spec,
            ..Default::default()
        }
    }
}

impl From<NatQueryType> for proto::NatInfoType {
    fn from(t: NatQueryType) -> Self {
        match t {
            NatQueryType::Any => proto::NatInfoType::Any,
            NatQueryType::Local => proto::NatInfoType::Local,
            NatQueryType::Neighbor => proto::NatInfoType::Neighbor,
        }
    }
}

// =============================================================================
// Firewall rules
// =============================================================================

impl From<TrafficDirection> for proto::TrafficDirection {
    fn from(d: TrafficDirection) -> Self {
        match d {
            TrafficDirection::Ingress => proto::TrafficDirection::Ingress,
            TrafficDirection::Egress => proto::TrafficDirection::Egress,
        }
    }
}

impl From<FirewallAction> for proto::FirewallAction {
    fn from(a: FirewallAction) -> Self {
        match a {
            FirewallAction::Drop => proto::FirewallAction::Drop,
            FirewallAction::Accept => proto::FirewallAction::Accept,
        }
    }
}

impl From<IpVersion> for proto::IpVersion {
    fn from(v: IpVersion) -> Self {
        match v {
            IpVersion::Ipv4 => proto::IpVersion::Ipv4,
            IpVersion::Ipv6 => proto::IpVersion::Ipv6,
        }
    }
}

impl From<ProtocolFilter> for proto::ProtocolFilter {
    fn from(f: ProtocolFilter) -> Self {
        use proto::protocol_filter::Filter;
        let filter = match f {
            ProtocolFilter::Tcp(p) => Filter::Tcp(proto::TcpFilter {
                src_port_lower: p.src_port_lower,
                src_port_upper: p.src_port_upper,
                dst_port_lower: p.dst_port_lower,
                dst_port_upper: p.dst_port_upper,
            }),
            ProtocolFilter::Udp(p) => Filter::Udp(proto::UdpFilter {
                src_port_lower: p.src_port_lower,
                src_port_upper: p.src_port_upper,
                dst_port_lower: p.dst_port_lower,
                dst_port_upper: p.dst_port_upper,
            }),
            ProtocolFilter::Icmp(i) => Filter::Icmp(proto::IcmpFilter {
                icmp_type: i.icmp_type,
                icmp_code: i.icmp_code,
            }),
        };
        proto::ProtocolFilter {
            filter: Some(filter),
        }
    }
}

fn protocol_filter_from_proto(f: &proto::ProtocolFilter) -> Option<ProtocolFilter> {
    use proto::protocol_filter::Filter;
    f.filter.as_ref().map(|filter| match filter {
        Filter::Tcp(t) => ProtocolFilter::Tcp(PortFilter {
            src_port_lower: t.src_port_lower,
            src_port_upper: t.src_port_upper,
            dst_port_lower: t.dst_port_lower,
            dst_port_upper: t.dst_port_upper,
        }),
        Filter::Udp(u) => ProtocolFilter::Udp(PortFilter {
            src_port_lower: u.src_port_lower,
            src_port_upper: u.src_port_upper,
            dst_port_lower: u.dst_port_lower,
            dst_port_upper: u.dst_port_upper,
        }),
        Filter::Icmp(i) => ProtocolFilter::Icmp(IcmpFilter {
            icmp_type: i.icmp_type,
            icmp_code: i.icmp_code,
        }),
    })
}

/// Parsed enumeration fields of a firewall rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalRule {
    pub direction: TrafficDirection,
    pub action: FirewallAction,
    pub ipver: IpVersion,
}

/// Parse the enumeration tokens of `spec` and rewrite them to canonical form.
///
/// Nothing is rewritten unless all three tokens are valid.
pub fn canonicalize_firewall_rule(spec: &mut FirewallRuleSpec) -> Result<CanonicalRule, InvalidEnumError> {
    let action: FirewallAction = spec.firewall_action.parse()?;
    let direction: TrafficDirection = spec.traffic_direction.parse()?;
    let ipver: IpVersion = spec.ip_version.parse()?;

    spec.firewall_action = action.as_str().to_string();
    spec.traffic_direction = direction.as_str().to_string();
    spec.ip_version = ipver.as_str().to_string();

    Ok(CanonicalRule {
        direction,
        action,
        ipver,
    })
}

/// Canonicalize `rule` in place and build its wire form.
pub fn firewall_rule_to_proto(rule: &mut FirewallRule) -> Result<proto::FirewallRule, InvalidEnumError> {
    let canonical = canonicalize_firewall_rule(&mut rule.spec)?;
    // A missing prefix is sent as the any-prefix of the rule's IP version.
    let prefix = |p: &Option<IpNet>| {
        let (addr, len) = match p {
            Some(net) => (net.addr(), net.prefix_len()),
            None => (unspecified(canonical.ipver), 0),
        };
        proto::Prefix {
            ip: Some(proto::IpAddress {
                ipver: proto::IpVersion::from(canonical.ipver) as i32,
                address: addr.to_string().into_bytes(),
            }),
            length: u32::from(len),
            underlay_route: Vec::new(),
        }
    };

    Ok(proto::FirewallRule {
        id: rule.spec.rule_id.clone().into_bytes(),
        direction: proto::TrafficDirection::from(canonical.direction) as i32,
        action: proto::FirewallAction::from(canonical.action) as i32,
        priority: rule.spec.priority,
        ipver: proto::IpVersion::from(canonical.ipver) as i32,
        source_prefix: Some(prefix(&rule.spec.source_prefix)),
        destination_prefix: Some(prefix(&rule.spec.destination_prefix)),
        protocol_filter: rule.spec.protocol_filter.map(proto::ProtocolFilter::from),
    })
}

pub fn firewall_rule_from_proto(interface_id: &str, rule: &proto::FirewallRule) -> Result<FirewallRule, Error> {
    let direction = match proto::TrafficDirection::try_from(rule.direction) {
        Ok(proto::TrafficDirection::Ingress) => TrafficDirection::Ingress,
        Ok(proto::TrafficDirection::Egress) => TrafficDirection::Egress,
        Err(_) => {
            return Err(InvalidEnumError::new(
                "direction",
                rule.direction.to_string(),
                TrafficDirection::ALLOWED,
            )
            .into())
        }
    };
    let action = match proto::FirewallAction::try_from(rule.action) {
        Ok(proto::FirewallAction::Drop) => FirewallAction::Drop,
        Ok(proto::FirewallAction::Accept) => FirewallAction::Accept,
        Err(_) => {
            return Err(
                InvalidEnumError::new("action", rule.action.to_string(), FirewallAction::ALLOWED).into(),
            )
        }
    };
    let ipver = match proto::IpVersion::try_from(rule.ipver) {
        Ok(proto::IpVersion::Ipv4) => IpVersion::Ipv4,
        Ok(proto::IpVersion::Ipv6) => IpVersion::Ipv6,
        Err(_) => {
            return Err(InvalidEnumError::new("ipver", rule.ipver.to_string(), IpVersion::ALLOWED).into())
        }
    };

    let source_prefix = match &rule.source_prefix {
        Some(p) => decode_prefix("source_prefix", p)?,
        None => None,
    };
    let destination_prefix = match &rule.destination_prefix {
        Some(p) => decode_prefix("destination_prefix", p)?,
        None => None,
    };

    Ok(FirewallRule {
        metadata: InterfaceScope {
            interface_id: interface_id.to_string(),
        },
        spec: FirewallRuleSpec {
            rule_id: String::from_utf8_lossy(&rule.id).into_owned(),
            traffic_direction: direction.as_str().to_string(),
            firewall_action: action.as_str().to_string(),
            priority: rule.priority,
            ip_version: ipver.as_str().to_string(),
            source_prefix,
            destination_prefix,
            protocol_filter: rule.protocol_filter.as_ref().and_then(protocol_filter_from_proto),
        },
        ..Default::default()
    })
}
