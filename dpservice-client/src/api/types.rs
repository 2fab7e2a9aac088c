//! Domain model for dataplane resources.
//!
//! Every resource has the shape `{kind, metadata, spec, status}`. The same
//! struct is used to describe a request and to expose a response; fields that
//! do not apply in one direction stay at their default.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::errors::InvalidEnumError;
use crate::proto;

// =============================================================================
// Kind / Status
// =============================================================================

/// Resource type tag. Serializes to the resource type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Interface,
    InterfaceList,
    LoadBalancer,
    LoadBalancerTarget,
    LoadBalancerTargetList,
    LoadBalancerPrefix,
    LoadBalancerPrefixList,
    Prefix,
    PrefixList,
    VirtualIP,
    Route,
    RouteList,
    Nat,
    NatList,
    NeighborNat,
    FirewallRule,
    FirewallRuleList,
    Initialized,
    Vni,
    Version,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Interface => "Interface",
            Kind::InterfaceList => "InterfaceList",
            Kind::LoadBalancer => "LoadBalancer",
            Kind::LoadBalancerTarget => "LoadBalancerTarget",
            Kind::LoadBalancerTargetList => "LoadBalancerTargetList",
            Kind::LoadBalancerPrefix => "LoadBalancerPrefix",
            Kind::LoadBalancerPrefixList => "LoadBalancerPrefixList",
            Kind::Prefix => "Prefix",
            Kind::PrefixList => "PrefixList",
            Kind::VirtualIP => "VirtualIP",
            Kind::Route => "Route",
            Kind::RouteList => "RouteList",
            Kind::Nat => "Nat",
            Kind::NatList => "NatList",
            Kind::NeighborNat => "NeighborNat",
            Kind::FirewallRule => "FirewallRule",
            Kind::FirewallRuleList => "FirewallRuleList",
            Kind::Initialized => "Initialized",
            Kind::Vni => "Vni",
            Kind::Version => "Version",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status embedded in every response. Code 0 is success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: i32,
    pub message: String,
}

impl Status {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code == 0 {
            f.write_str(&self.message)
        } else {
            write!(f, "Code: {}, Message: {}", self.code, self.message)
        }
    }
}

/// A single resource.
pub trait Object {
    fn kind(&self) -> Kind;
    fn name(&self) -> String;
    fn status(&self) -> &Status;
}

/// A list of resources, in the order the service returned them.
pub trait List {
    fn items(&self) -> Vec<&dyn Object>;
    fn status(&self) -> &Status;
}

macro_rules! resource {
    ($ty:ident, |$s:ident| $name:expr) => {
        impl Default for $ty {
            fn default() -> Self {
                Self {
                    kind: Kind::$ty,
                    metadata: Default::default(),
                    spec: Default::default(),
                    status: Status::default(),
                }
            }
        }

        impl Object for $ty {
            fn kind(&self) -> Kind {
                self.kind
            }

            fn name(&self) -> String {
                let $s = self;
                $name
            }

            fn status(&self) -> &Status {
                &self.status
            }
        }
    };
}

macro_rules! resource_list {
    ($ty:ident) => {
        impl Default for $ty {
            fn default() -> Self {
                Self {
                    kind: Kind::$ty,
                    metadata: Default::default(),
                    status: Status::default(),
                    items: Vec::new(),
                }
            }
        }

        impl List for $ty {
            fn items(&self) -> Vec<&dyn Object> {
                self.items.iter().map(|i| i as &dyn Object).collect()
            }

            fn status(&self) -> &Status {
                &self.status
            }
        }
    };
}

fn display_opt<T: fmt::Display>(v: &Option<T>) -> String {
    v.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

// =============================================================================
// Canonical enumerations
// =============================================================================

/// Firewall verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FirewallAction {
    #[default]
    Drop,
    Accept,
}

impl FirewallAction {
    pub const ALLOWED: &'static [&'static str] = &["drop", "deny", "0", "accept", "allow", "1"];

    pub fn as_str(&self) -> &'static str {
        match self {
            FirewallAction::Drop => "Drop",
            FirewallAction::Accept => "Accept",
        }
    }
}

impl FromStr for FirewallAction {
    type Err = InvalidEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "accept" | "allow" | "1" => Ok(FirewallAction::Accept),
            "drop" | "deny" | "0" => Ok(FirewallAction::Drop),
            _ => Err(InvalidEnumError::new("firewallAction", s, Self::ALLOWED)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrafficDirection {
    #[default]
    Ingress,
    Egress,
}

impl TrafficDirection {
    pub const ALLOWED: &'static [&'static str] = &["ingress", "0", "egress", "1"];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficDirection::Ingress => "Ingress",
            TrafficDirection::Egress => "Egress",
        }
    }
}

impl FromStr for TrafficDirection {
    type Err = InvalidEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ingress" | "0" => Ok(TrafficDirection::Ingress),
            "egress" | "1" => Ok(TrafficDirection::Egress),
            _ => Err(InvalidEnumError::new("trafficDirection", s, Self::ALLOWED)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpVersion {
    #[default]
    #[serde(rename = "IPv4")]
    Ipv4,
    #[serde(rename = "IPv6")]
    Ipv6,
}

impl IpVersion {
    pub const ALLOWED: &'static [&'static str] = &["ipv4", "0", "ipv6", "1"];

    pub fn as_str(&self) -> &'static str {
        match self {
            IpVersion::Ipv4 => "IPv4",
            IpVersion::Ipv6 => "IPv6",
        }
    }

    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => IpVersion::Ipv4,
            IpAddr::V6(_) => IpVersion::Ipv6,
        }
    }
}

impl FromStr for IpVersion {
    type Err = InvalidEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ipv4" | "0" => Ok(IpVersion::Ipv4),
            "ipv6" | "1" => Ok(IpVersion::Ipv6),
            _ => Err(InvalidEnumError::new("ipVersion", s, Self::ALLOWED)),
        }
    }
}

/// Which NAT translations a NAT info query returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NatQueryType {
    /// Local and neighbor entries, local first.
    #[default]
    Any,
    Local,
    Neighbor,
}

impl NatQueryType {
    /// Accepted tokens. An empty token is also read as `Any`.
    pub const ALLOWED: &'static [&'static str] =
        &["any", "0", "local", "1", "neigh", "neighbor", "2"];

    pub fn as_str(&self) -> &'static str {
        match self {
            NatQueryType::Any => "Any",
            NatQueryType::Local => "Local",
            NatQueryType::Neighbor => "Neighbor",
        }
    }
}

impl FromStr for NatQueryType {
    type Err = InvalidEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any" | "0" | "" => Ok(NatQueryType::Any),
            "local" | "1" => Ok(NatQueryType::Local),
            "neigh" | "neighbor" | "2" => Ok(NatQueryType::Neighbor),
            _ => Err(InvalidEnumError::new("natType", s, Self::ALLOWED)),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(FirewallAction, TrafficDirection, IpVersion, NatQueryType);

// =============================================================================
// Routes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub kind: Kind,
    pub metadata: RouteMeta,
    pub spec: RouteSpec,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMeta {
    pub vni: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<IpNet>,
    #[serde(default)]
    pub next_hop: RouteNextHop,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteNextHop {
    pub vni: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<IpAddr>,
}

resource!(Route, |r| format!(
    "{}-{}",
    display_opt(&r.spec.prefix),
    r.spec.next_hop.vni
));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteList {
    pub kind: Kind,
    pub metadata: RouteMeta,
    #[serde(default)]
    pub status: Status,
    pub items: Vec<Route>,
}

resource_list!(RouteList);

// =============================================================================
// Prefixes
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceScope {
    #[serde(rename = "interfaceID")]
    pub interface_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefixSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<IpNet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlay_route: Option<IpAddr>,
}

/// An alias prefix routed to an interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prefix {
    pub kind: Kind,
    pub metadata: InterfaceScope,
    pub spec: PrefixSpec,
    #[serde(default)]
    pub status: Status,
}

resource!(Prefix, |p| display_opt(&p.spec.prefix));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixList {
    pub kind: Kind,
    pub metadata: InterfaceScope,
    #[serde(default)]
    pub status: Status,
    pub items: Vec<Prefix>,
}

resource_list!(PrefixList);

/// A prefix announced for a load balancer on an interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancerPrefix {
    pub kind: Kind,
    pub metadata: InterfaceScope,
    pub spec: PrefixSpec,
    #[serde(default)]
    pub status: Status,
}

resource!(LoadBalancerPrefix, |p| display_opt(&p.spec.prefix));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancerPrefixList {
    pub kind: Kind,
    pub metadata: InterfaceScope,
    #[serde(default)]
    pub status: Status,
    pub items: Vec<LoadBalancerPrefix>,
}

resource_list!(LoadBalancerPrefixList);

// =============================================================================
// Virtual IPs
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualIpSpec {
    #[serde(default)]
    pub ip: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlay_route: Option<IpAddr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualIp {
    pub kind: Kind,
    pub metadata: InterfaceScope,
    pub spec: VirtualIpSpec,
    #[serde(default)]
    pub status: Status,
}

impl Default for VirtualIp {
    fn default() -> Self {
        Self {
            kind: Kind::VirtualIP,
            metadata: InterfaceScope::default(),
            spec: VirtualIpSpec::default(),
            status: Status::default(),
        }
    }
}

impl Object for VirtualIp {
    fn kind(&self) -> Kind {
        self.kind
    }

    fn name(&self) -> String {
        format!("on interface: {}", self.metadata.interface_id)
    }

    fn status(&self) -> &Status {
        &self.status
    }
}

// =============================================================================
// Load balancers
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerMeta {
    pub id: String,
}

/// A load balanced port, written `<protocol>/<port>` (e.g. `tcp/443`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LbPort {
    /// IP protocol number.
    pub protocol: u32,
    pub port: u32,
}

impl LbPort {
    /// Protocol names accepted on a port.
    pub const PROTOCOLS: &'static [&'static str] = &["undefined", "icmp", "tcp", "udp", "icmpv6", "sctp"];

    pub fn protocol_name(&self) -> &'static str {
        match i32::try_from(self.protocol).ok().and_then(|p| proto::Protocol::try_from(p).ok()) {
            Some(proto::Protocol::Icmp) => "icmp",
            Some(proto::Protocol::Tcp) => "tcp",
            Some(proto::Protocol::Udp) => "udp",
            Some(proto::Protocol::Icmpv6) => "icmpv6",
            Some(proto::Protocol::Sctp) => "sctp",
            _ => "undefined",
        }
    }
}

impl fmt::Display for LbPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.protocol_name(), self.port)
    }
}

impl FromStr for LbPort {
    type Err = InvalidEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALLOWED: &[&str] = &["icmp/<port>", "tcp/<port>", "udp/<port>", "sctp/<port>", "icmpv6/<port>"];
        let invalid = || InvalidEnumError::new("lbPort", s, ALLOWED);

        let (proto_name, port) = s.split_once('/').ok_or_else(invalid)?;
        let protocol = match proto_name.to_lowercase().as_str() {
            "icmp" => proto::Protocol::Icmp,
            "tcp" => proto::Protocol::Tcp,
            "udp" => proto::Protocol::Udp,
            "sctp" => proto::Protocol::Sctp,
            "icmpv6" => proto::Protocol::Icmpv6,
            _ => return Err(invalid()),
        };
        let port: u16 = port.trim().parse().map_err(|_| invalid())?;

        Ok(LbPort {
            protocol: protocol as u32,
            port: u32::from(port),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerSpec {
    #[serde(default)]
    pub vni: u32,
    #[serde(rename = "lbVipIP", default, skip_serializing_if = "Option::is_none")]
    pub lb_vip_ip: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lbports: Vec<LbPort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlay_route: Option<IpAddr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub kind: Kind,
    pub metadata: LoadBalancerMeta,
    pub spec: LoadBalancerSpec,
    #[serde(default)]
    pub status: Status,
}

resource!(LoadBalancer, |lb| lb.metadata.id.clone());

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerTargetMeta {
    #[serde(rename = "loadbalancerID")]
    pub loadbalancer_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerTargetSpec {
    #[serde(rename = "targetIP", default, skip_serializing_if = "Option::is_none")]
    pub target_ip: Option<IpAddr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancerTarget {
    pub kind: Kind,
    pub metadata: LoadBalancerTargetMeta,
    pub spec: LoadBalancerTargetSpec,
    #[serde(default)]
    pub status: Status,
}

resource!(LoadBalancerTarget, |t| format!(
    "on loadbalancer: {}",
    t.metadata.loadbalancer_id
));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancerTargetList {
    pub kind: Kind,
    pub metadata: LoadBalancerTargetMeta,
    #[serde(default)]
    pub status: Status,
    pub items: Vec<LoadBalancerTarget>,
}

resource_list!(LoadBalancerTargetList);

// =============================================================================
// Interfaces
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceMeta {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pxe {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_name: String,
}

/// PCI virtual function handed out for an interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualFunction {
    #[serde(rename = "vfName", default)]
    pub name: String,
    #[serde(rename = "vfDomain", default)]
    pub domain: u32,
    #[serde(rename = "vfBus", default)]
    pub bus: u32,
    #[serde(rename = "vfSlot", default)]
    pub slot: u32,
    #[serde(rename = "vfFunction", default)]
    pub function: u32,
}

impl fmt::Display for VirtualFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name: {}, Domain: {}, Bus: {}, Slot: {}, Function: {}",
            self.name, self.domain, self.bus, self.slot, self.function
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceSpec {
    #[serde(default)]
    pub vni: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub device: String,
    /// Primary addresses; at most one IPv4 and one IPv6 are used.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ips: Vec<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlay_route: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_function: Option<VirtualFunction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pxe: Option<Pxe>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub kind: Kind,
    pub metadata: InterfaceMeta,
    pub spec: InterfaceSpec,
    #[serde(default)]
    pub status: Status,
}

resource!(Interface, |i| i.metadata.id.clone());

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceListMeta {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceList {
    pub kind: Kind,
    pub metadata: InterfaceListMeta,
    #[serde(default)]
    pub status: Status,
    pub items: Vec<Interface>,
}

resource_list!(InterfaceList);

// =============================================================================
// NAT
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatMeta {
    #[serde(rename = "interfaceID", default, skip_serializing_if = "String::is_empty")]
    pub interface_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NatSpec {
    #[serde(rename = "natVIPIP", default, skip_serializing_if = "Option::is_none")]
    pub nat_ip: Option<IpAddr>,
    #[serde(default)]
    pub min_port: u32,
    #[serde(default)]
    pub max_port: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlay_route: Option<IpAddr>,
    #[serde(default)]
    pub vni: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nat {
    pub kind: Kind,
    pub metadata: NatMeta,
    pub spec: NatSpec,
    #[serde(default)]
    pub status: Status,
}

resource!(Nat, |n| n.metadata.interface_id.clone());

impl fmt::Display for Nat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <{}, {}>",
            display_opt(&self.spec.nat_ip),
            self.spec.min_port,
            self.spec.max_port
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NatListMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nat_ip: Option<IpAddr>,
    #[serde(default)]
    pub nat_type: NatQueryType,
}

/// Result of a NAT info query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NatList {
    pub kind: Kind,
    pub metadata: NatListMeta,
    #[serde(default)]
    pub status: Status,
    pub items: Vec<Nat>,
}

resource_list!(NatList);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborNatMeta {
    #[serde(rename = "natVIPIP", default)]
    pub nat_ip: Option<IpAddr>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborNatSpec {
    #[serde(default)]
    pub vni: u32,
    #[serde(default)]
    pub min_port: u32,
    #[serde(default)]
    pub max_port: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlay_route: Option<IpAddr>,
}

/// A NAT port range owned by another dataplane node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborNat {
    pub kind: Kind,
    pub metadata: NeighborNatMeta,
    pub spec: NeighborNatSpec,
    #[serde(default)]
    pub status: Status,
}

resource!(NeighborNat, |n| display_opt(&n.metadata.nat_ip));

// =============================================================================
// Firewall rules
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortFilter {
    pub src_port_lower: i32,
    pub src_port_upper: i32,
    pub dst_port_lower: i32,
    pub dst_port_upper: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IcmpFilter {
    pub icmp_type: i32,
    pub icmp_code: i32,
}

/// Layer 4 match of a firewall rule. `-1` matches any port, type or code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolFilter {
    Tcp(PortFilter),
    Udp(PortFilter),
    Icmp(IcmpFilter),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRuleSpec {
    #[serde(rename = "ruleID", default)]
    pub rule_id: String,
    /// Any token accepted by [`TrafficDirection`]; canonical after create.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub traffic_direction: String,
    /// Any token accepted by [`FirewallAction`]; canonical after create.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub firewall_action: String,
    #[serde(default)]
    pub priority: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_prefix: Option<IpNet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_prefix: Option<IpNet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_filter: Option<ProtocolFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallRule {
    pub kind: Kind,
    pub metadata: InterfaceScope,
    pub spec: FirewallRuleSpec,
    #[serde(default)]
    pub status: Status,
}

resource!(FirewallRule, |r| format!(
    "{}/{}",
    r.metadata.interface_id, r.spec.rule_id
));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallRuleList {
    pub kind: Kind,
    pub metadata: InterfaceScope,
    #[serde(default)]
    pub status: Status,
    pub items: Vec<FirewallRule>,
}

resource_list!(FirewallRuleList);

// =============================================================================
// Service state
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializedMeta {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializedSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uuid: String,
}

/// Marker returned by initialize and check-initialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Initialized {
    pub kind: Kind,
    pub metadata: InitializedMeta,
    pub spec: InitializedSpec,
    #[serde(default)]
    pub status: Status,
}

resource!(Initialized, |_i| "initialized".to_string());

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VniMeta {
    pub vni: u32,
    /// 0 = IPv4, 1 = IPv6, 2 = both.
    pub vni_type: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VniSpec {
    pub in_use: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vni {
    pub kind: Kind,
    pub metadata: VniMeta,
    pub spec: VniSpec,
    #[serde(default)]
    pub status: Status,
}

resource!(Vni, |v| v.metadata.vni.to_string());

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMeta {
    #[serde(rename = "clientProto")]
    pub client_protocol: String,
    #[serde(rename = "clientName")]
    pub client_name: String,
    #[serde(rename = "clientVer")]
    pub client_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSpec {
    #[serde(rename = "svcProto", default)]
    pub service_protocol: String,
    #[serde(rename = "svcVer", default)]
    pub service_version: String,
}

/// Protocol and software versions exchanged with the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub kind: Kind,
    pub metadata: VersionMeta,
    pub spec: VersionSpec,
    #[serde(default)]
    pub status: Status,
}

resource!(Version, |v| format!(
    "{}-{}",
    v.metadata.client_name, v.metadata.client_protocol
));
