//! Table and JSON rendering of client results.

use std::fmt::Display;

use clap::ValueEnum;
use serde::Serialize;
use tabled::{Table, Tabled};

use dpservice_client::api::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Print `value` as JSON, or `rows` as a table.
pub fn emit<T: Serialize, R: Tabled>(format: OutputFormat, value: &T, rows: Vec<R>, empty: &str) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table if rows.is_empty() => println!("{}", empty),
        OutputFormat::Table => println!("{}", Table::new(rows)),
    }
    Ok(())
}

fn opt<T: Display>(v: &Option<T>) -> String {
    v.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn join<T: Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "-".to_string();
    }
    items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(",")
}

#[derive(Tabled)]
pub struct InterfaceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "VNI")]
    vni: u32,
    #[tabled(rename = "DEVICE")]
    device: String,
    #[tabled(rename = "IPS")]
    ips: String,
    #[tabled(rename = "UNDERLAY ROUTE")]
    underlay_route: String,
    #[tabled(rename = "VF")]
    vf: String,
}

impl From<&Interface> for InterfaceRow {
    fn from(iface: &Interface) -> Self {
        Self {
            id: iface.metadata.id.clone(),
            vni: iface.spec.vni,
            device: iface.spec.device.clone(),
            ips: join(&iface.spec.ips),
            underlay_route: opt(&iface.spec.underlay_route),
            vf: iface
                .spec
                .virtual_function
                .as_ref()
                .map(|vf| vf.name.clone())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[derive(Tabled)]
pub struct PrefixRow {
    #[tabled(rename = "INTERFACE")]
    interface_id: String,
    #[tabled(rename = "PREFIX")]
    prefix: String,
    #[tabled(rename = "UNDERLAY ROUTE")]
    underlay_route: String,
}

impl PrefixRow {
    pub fn new(scope: &InterfaceScope, spec: &PrefixSpec) -> Self {
        Self {
            interface_id: scope.interface_id.clone(),
            prefix: opt(&spec.prefix),
            underlay_route: opt(&spec.underlay_route),
        }
    }
}

impl From<&Prefix> for PrefixRow {
    fn from(p: &Prefix) -> Self {
        Self::new(&p.metadata, &p.spec)
    }
}

impl From<&LoadBalancerPrefix> for PrefixRow {
    fn from(p: &LoadBalancerPrefix) -> Self {
        Self::new(&p.metadata, &p.spec)
    }
}

#[derive(Tabled)]
pub struct RouteRow {
    #[tabled(rename = "VNI")]
    vni: u32,
    #[tabled(rename = "PREFIX")]
    prefix: String,
    #[tabled(rename = "NEXT HOP VNI")]
    next_hop_vni: u32,
    #[tabled(rename = "NEXT HOP IP")]
    next_hop_ip: String,
}

impl From<&Route> for RouteRow {
    fn from(r: &Route) -> Self {
        Self {
            vni: r.metadata.vni,
            prefix: opt(&r.spec.prefix),
            next_hop_vni: r.spec.next_hop.vni,
            next_hop_ip: opt(&r.spec.next_hop.ip),
        }
    }
}

#[derive(Tabled)]
pub struct VirtualIpRow {
    #[tabled(rename = "INTERFACE")]
    interface_id: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "UNDERLAY ROUTE")]
    underlay_route: String,
}

impl From<&VirtualIp> for VirtualIpRow {
    fn from(v: &VirtualIp) -> Self {
        Self {
            interface_id: v.metadata.interface_id.clone(),
            ip: opt(&v.spec.ip),
            underlay_route: opt(&v.spec.underlay_route),
        }
    }
}

#[derive(Tabled)]
pub struct LoadBalancerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "VNI")]
    vni: u32,
    #[tabled(rename = "VIP")]
    vip: String,
    #[tabled(rename = "PORTS")]
    ports: String,
    #[tabled(rename = "UNDERLAY ROUTE")]
    underlay_route: String,
}

impl From<&LoadBalancer> for LoadBalancerRow {
    fn from(lb: &LoadBalancer) -> Self {
        Self {
            id: lb.metadata.id.clone(),
            vni: lb.spec.vni,
            vip: opt(&lb.spec.lb_vip_ip),
            ports: join(&lb.spec.lbports),
            underlay_route: opt(&lb.spec.underlay_route),
        }
    }
}

#[derive(Tabled)]
pub struct LoadBalancerTargetRow {
    #[tabled(rename = "LOADBALANCER")]
    loadbalancer_id: String,
    #[tabled(rename = "TARGET IP")]
    target_ip: String,
}

impl From<&LoadBalancerTarget> for LoadBalancerTargetRow {
    fn from(t: &LoadBalancerTarget) -> Self {
        Self {
            loadbalancer_id: t.metadata.loadbalancer_id.clone(),
            target_ip: opt(&t.spec.target_ip),
        }
    }
}

#[derive(Tabled)]
pub struct NatRow {
    #[tabled(rename = "INTERFACE")]
    interface_id: String,
    #[tabled(rename = "NAT IP")]
    nat_ip: String,
    #[tabled(rename = "MIN PORT")]
    min_port: u32,
    #[tabled(rename = "MAX PORT")]
    max_port: u32,
    #[tabled(rename = "UNDERLAY ROUTE")]
    underlay_route: String,
    #[tabled(rename = "VNI")]
    vni: u32,
}

impl From<&Nat> for NatRow {
    fn from(n: &Nat) -> Self {
        Self {
            interface_id: if n.metadata.interface_id.is_empty() {
                "-".to_string()
            } else {
                n.metadata.interface_id.clone()
            },
            nat_ip: opt(&n.spec.nat_ip),
            min_port: n.spec.min_port,
            max_port: n.spec.max_port,
            underlay_route: opt(&n.spec.underlay_route),
            vni: n.spec.vni,
        }
    }
}

#[derive(Tabled)]
pub struct NeighborNatRow {
    #[tabled(rename = "NAT IP")]
    nat_ip: String,
    #[tabled(rename = "VNI")]
    vni: u32,
    #[tabled(rename = "MIN PORT")]
    min_port: u32,
    #[tabled(rename = "MAX PORT")]
    max_port: u32,
    #[tabled(rename = "UNDERLAY ROUTE")]
    underlay_route: String,
}

impl From<&NeighborNat> for NeighborNatRow {
    fn from(n: &NeighborNat) -> Self {
        Self {
            nat_ip: opt(&n.metadata.nat_ip),
            vni: n.spec.vni,
            min_port: n.spec.min_port,
            max_port: n.spec.max_port,
            underlay_route: opt(&n.spec.underlay_route),
        }
    }
}

fn protocol_filter(filter: &Option<ProtocolFilter>) -> String {
    match filter {
        None => "-".to_string(),
        Some(ProtocolFilter::Tcp(p)) => format!(
            "tcp src {}:{} dst {}:{}",
            p.src_port_lower, p.src_port_upper, p.dst_port_lower, p.dst_port_upper
        ),
        Some(ProtocolFilter::Udp(p)) => format!(
            "udp src {}:{} dst {}:{}",
            p.src_port_lower, p.src_port_upper, p.dst_port_lower, p.dst_port_upper
        ),
        Some(ProtocolFilter::Icmp(i)) => format!("icmp type {} code {}", i.icmp_type, i.icmp_code),
    }
}

#[derive(Tabled)]
pub struct FirewallRuleRow {
    #[tabled(rename = "INTERFACE")]
    interface_id: String,
    #[tabled(rename = "ID")]
    rule_id: String,
    #[tabled(rename = "DIRECTION")]
    direction: String,
    #[tabled(rename = "ACTION")]
    action: String,
    #[tabled(rename = "PRIORITY")]
    priority: u32,
    #[tabled(rename = "IPV")]
    ip_version: String,
    #[tabled(rename = "SOURCE")]
    source: String,
    #[tabled(rename = "DESTINATION")]
    destination: String,
    #[tabled(rename = "PROTOCOL")]
    protocol: String,
}

impl From<&FirewallRule> for FirewallRuleRow {
    fn from(r: &FirewallRule) -> Self {
        Self {
            interface_id: r.metadata.interface_id.clone(),
            rule_id: r.spec.rule_id.clone(),
            direction: r.spec.traffic_direction.clone(),
            action: r.spec.firewall_action.clone(),
            priority: r.spec.priority,
            ip_version: r.spec.ip_version.clone(),
            source: opt(&r.spec.source_prefix),
            destination: opt(&r.spec.destination_prefix),
            protocol: protocol_filter(&r.spec.protocol_filter),
        }
    }
}

#[derive(Tabled)]
pub struct VniRow {
    #[tabled(rename = "VNI")]
    vni: u32,
    #[tabled(rename = "TYPE")]
    vni_type: &'static str,
    #[tabled(rename = "IN USE")]
    in_use: bool,
}

impl From<&Vni> for VniRow {
    fn from(v: &Vni) -> Self {
        Self {
            vni: v.metadata.vni,
            vni_type: match v.metadata.vni_type {
                0 => "ipv4",
                1 => "ipv6",
                _ => "both",
            },
            in_use: v.spec.in_use,
        }
    }
}

#[derive(Tabled)]
pub struct VersionRow {
    #[tabled(rename = "CLIENT")]
    client: String,
    #[tabled(rename = "CLIENT PROTOCOL")]
    client_protocol: String,
    #[tabled(rename = "SERVICE PROTOCOL")]
    service_protocol: String,
    #[tabled(rename = "SERVICE VERSION")]
    service_version: String,
}

impl From<&Version> for VersionRow {
    fn from(v: &Version) -> Self {
        Self {
            client: format!("{} {}", v.metadata.client_name, v.metadata.client_version),
            client_protocol: v.metadata.client_protocol.clone(),
            service_protocol: v.spec.service_protocol.clone(),
            service_version: v.spec.service_version.clone(),
        }
    }
}

#[derive(Tabled)]
pub struct InitializedRow {
    #[tabled(rename = "UUID")]
    uuid: String,
}

impl From<&Initialized> for InitializedRow {
    fn from(i: &Initialized) -> Self {
        Self {
            uuid: i.spec.uuid.clone(),
        }
    }
}
