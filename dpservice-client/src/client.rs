//! Operation client: one method per domain verb.
//!
//! Each method builds the wire request, issues the call, and classifies the
//! outcome. A transport failure becomes [`Error::Transport`], a nonzero status
//! becomes [`Error::Server`]; both name the resource the call was about. Only a
//! successful response is converted.

use std::net::IpAddr;

use ipnet::IpNet;
use tracing::debug;

use crate::api::conversion::{
    create_interface_request, create_load_balancer_request, decode_addr, decode_ip_address,
    encode_addr, encode_opt_addr, encode_prefix, firewall_rule_from_proto, firewall_rule_to_proto,
    interface_from_proto, load_balancer_from_proto, nat_from_proto, prefix_spec_from_proto,
    route_from_proto, route_to_proto, status_of, virtual_ip_from_proto, NatInfoEntry,
};
use crate::api::types::*;
use crate::config::ClientConfig;
use crate::errors::{Error, Result};
use crate::proto;
use crate::transport::{DpdkService, GrpcTransport};

/// Fail with [`Error::Server`] unless the embedded status is success.
fn check(status: Option<&proto::Status>, kind: Kind, name: impl Into<String>) -> Result<Status> {
    let status = status_of(status);
    if status.is_ok() {
        Ok(status)
    } else {
        Err(Error::Server {
            kind,
            name: name.into(),
            status,
        })
    }
}

/// Attach the resource a call was about to its transport failure.
fn transport_error(kind: Kind, name: impl Into<String>) -> impl FnOnce(tonic::Status) -> Error {
    let name = name.into();
    move |status| Error::transport(kind, name, status)
}

/// Typed client for dp-service.
#[derive(Debug, Clone)]
pub struct Client<T> {
    transport: T,
}

impl Client<GrpcTransport> {
    /// Connect over gRPC.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(GrpcTransport::connect(config).await?))
    }
}

impl<T: DpdkService> Client<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // =========================================================================
    // Load balancers
    // =========================================================================

    pub async fn get_load_balancer(&self, id: &str) -> Result<LoadBalancer> {
        debug!(loadbalancer_id = id, "Getting load balancer");
        let res = self
            .transport
            .get_load_balancer(proto::GetLoadBalancerRequest {
                loadbalancer_id: id.as_bytes().to_vec(),
            })
            .await
            .map_err(transport_error(Kind::LoadBalancer, id))?;
        check(res.status.as_ref(), Kind::LoadBalancer, id)?;
        load_balancer_from_proto(id, &res)
    }

    pub async fn create_load_balancer(&self, lb: &LoadBalancer) -> Result<LoadBalancer> {
        debug!(loadbalancer_id = %lb.metadata.id, vni = lb.spec.vni, "Creating load balancer");
        let res = self
            .transport
            .create_load_balancer(create_load_balancer_request(lb)?)
            .await
            .map_err(transport_error(Kind::LoadBalancer, lb.metadata.id.as_str()))?;
        let status = check(res.status.as_ref(), Kind::LoadBalancer, lb.metadata.id.as_str())?;

        let mut created = lb.clone();
        created.kind = Kind::LoadBalancer;
        created.spec.underlay_route = decode_addr("underlay_route", &res.underlay_route)?;
        created.status = status;
        Ok(created)
    }

    pub async fn delete_load_balancer(&self, id: &str) -> Result<LoadBalancer> {
        debug!(loadbalancer_id = id, "Deleting load balancer");
        let res = self
            .transport
            .delete_load_balancer(proto::DeleteLoadBalancerRequest {
                loadbalancer_id: id.as_bytes().to_vec(),
            })
            .await
            .map_err(transport_error(Kind::LoadBalancer, id))?;
        let status = check(res.status.as_ref(), Kind::LoadBalancer, id)?;
        Ok(LoadBalancer {
            metadata: LoadBalancerMeta { id: id.to_string() },
            status,
            ..Default::default()
        })
    }

    pub async fn list_load_balancer_prefixes(&self, interface_id: &str) -> Result<LoadBalancerPrefixList> {
        debug!(interface_id, "Listing load balancer prefixes");
        let res = self
            .transport
            .list_load_balancer_prefixes(proto::ListLoadBalancerPrefixesRequest {
                interface_id: interface_id.as_bytes().to_vec(),
            })
            .await
            .map_err(transport_error(Kind::LoadBalancerPrefixList, interface_id))?;
        let status = check(res.status.as_ref(), Kind::LoadBalancerPrefixList, interface_id)?;

        let scope = InterfaceScope {
            interface_id: interface_id.to_string(),
        };
        let items = res
            .prefixes
            .iter()
            .map(|p| -> Result<LoadBalancerPrefix> {
                Ok(LoadBalancerPrefix {
                    metadata: scope.clone(),
                    spec: prefix_spec_from_proto(p)?,
                    ..Default::default()
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(LoadBalancerPrefixList {
            metadata: scope,
            status,
            items,
            ..Default::default()
        })
    }

    pub async fn create_load_balancer_prefix(&self, prefix: &LoadBalancerPrefix) -> Result<LoadBalancerPrefix> {
        debug!(interface_id = %prefix.metadata.interface_id, prefix = ?prefix.spec.prefix, "Creating load balancer prefix");
        let res = self
            .transport
            .create_load_balancer_prefix(proto::CreateLoadBalancerPrefixRequest {
                interface_id: prefix.metadata.interface_id.as_bytes().to_vec(),
                prefix: prefix.spec.prefix.as_ref().map(encode_prefix),
            })
            .await
            .map_err(transport_error(Kind::LoadBalancerPrefix, prefix.name()))?;
        let status = check(res.status.as_ref(), Kind::LoadBalancerPrefix, prefix.name())?;

        let mut created = prefix.clone();
        created.kind = Kind::LoadBalancerPrefix;
        created.spec.underlay_route = decode_addr("underlay_route", &res.underlay_route)?;
        created.status = status;
        Ok(created)
    }

    pub async fn delete_load_balancer_prefix(&self, interface_id: &str, prefix: &IpNet) -> Result<LoadBalancerPrefix> {
        debug!(interface_id, %prefix, "Deleting load balancer prefix");
        let res = self
            .transport
            .delete_load_balancer_prefix(proto::DeleteLoadBalancerPrefixRequest {
                interface_id: interface_id.as_bytes().to_vec(),
                prefix: Some(encode_prefix(prefix)),
            })
            .await
            .map_err(transport_error(Kind::LoadBalancerPrefix, prefix.to_string()))?;
        let status = check(res.status.as_ref(), Kind::LoadBalancerPrefix, prefix.to_string())?;
        Ok(LoadBalancerPrefix {
            metadata: InterfaceScope {
                interface_id: interface_id.to_string(),
            },
            spec: PrefixSpec {
                prefix: Some(*prefix),
                underlay_route: None,
            },
            status,
            ..Default::default()
        })
    }

    pub async fn list_load_balancer_targets(&self, loadbalancer_id: &str) -> Result<LoadBalancerTargetList> {
        debug!(loadbalancer_id, "Listing load balancer targets");
        let res = self
            .transport
            .list_load_balancer_targets(proto::ListLoadBalancerTargetsRequest {
                loadbalancer_id: loadbalancer_id.as_bytes().to_vec(),
            })
            .await
            .map_err(transport_error(Kind::LoadBalancerTargetList, loadbalancer_id))?;
        let status = check(res.status.as_ref(), Kind::LoadBalancerTargetList, loadbalancer_id)?;

        let meta = LoadBalancerTargetMeta {
            loadbalancer_id: loadbalancer_id.to_string(),
        };
        let items = res
            .target_ips
            .iter()
            .map(|ip| -> Result<LoadBalancerTarget> {
                Ok(LoadBalancerTarget {
                    metadata: meta.clone(),
                    spec: LoadBalancerTargetSpec {
                        target_ip: decode_ip_address("target_ip", Some(ip))?,
                    },
                    ..Default::default()
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(LoadBalancerTargetList {
            metadata: meta,
            status,
            items,
            ..Default::default()
        })
    }

    pub async fn create_load_balancer_target(&self, target: &LoadBalancerTarget) -> Result<LoadBalancerTarget> {
        debug!(loadbalancer_id = %target.metadata.loadbalancer_id, target_ip = ?target.spec.target_ip, "Creating load balancer target");
        let res = self
            .transport
            .create_load_balancer_target(proto::CreateLoadBalancerTargetRequest {
                loadbalancer_id: target.metadata.loadbalancer_id.as_bytes().to_vec(),
                target_ip: target.spec.target_ip.as_ref().map(encode_addr),
            })
            .await
            .map_err(transport_error(Kind::LoadBalancerTarget, target.name()))?;
        let status = check(res.status.as_ref(), Kind::LoadBalancerTarget, target.name())?;

        let mut created = target.clone();
        created.kind = Kind::LoadBalancerTarget;
        created.status = status;
        Ok(created)
    }

    pub async fn delete_load_balancer_target(&self, loadbalancer_id: &str, target_ip: &IpAddr) -> Result<LoadBalancerTarget> {
        debug!(loadbalancer_id, %target_ip, "Deleting load balancer target");
        let target = LoadBalancerTarget {
            metadata: LoadBalancerTargetMeta {
                loadbalancer_id: loadbalancer_id.to_string(),
            },
            spec: LoadBalancerTargetSpec {
                target_ip: Some(*target_ip),
            },
            ..Default::default()
        };
        let res = self
            .transport
            .delete_load_balancer_target(proto::DeleteLoadBalancerTargetRequest {
                loadbalancer_id: loadbalancer_id.as_bytes().to_vec(),
                target_ip: Some(encode_addr(target_ip)),
            })
            .await
            .map_err(transport_error(Kind::LoadBalancerTarget, target.name()))?;
        let status = check(res.status.as_ref(), Kind::LoadBalancerTarget, target.name())?;
        Ok(LoadBalancerTarget { status, ..target })
    }

    // =========================================================================
    // Interfaces
    // =========================================================================

    pub async fn get_interface(&self, id: &str) -> Result<Interface> {
        debug!(interface_id = id, "Getting interface");
        let res = self
            .transport
            .get_interface(proto::GetInterfaceRequest {
                interface_id: id.as_bytes().to_vec(),
            })
            .await
            .map_err(transport_error(Kind::Interface, id))?;
        let status = check(res.status.as_ref(), Kind::Interface, id)?;

        let mut iface = match &res.interface {
            Some(wire) => interface_from_proto(wire)?,
            None => {
                return Err(Error::InconsistentResponse(format!(
                    "interface {} missing from successful response",
                    id
                )))
            }
        };
        iface.status = status;
        Ok(iface)
    }

    pub async fn list_interfaces(&self) -> Result<InterfaceList> {
        debug!("Listing interfaces");
        let res = self
            .transport
            .list_interfaces(proto::ListInterfacesRequest {})
            .await
            .map_err(transport_error(Kind::InterfaceList, ""))?;
        let status = check(res.status.as_ref(), Kind::InterfaceList, "")?;

        let items = res
            .interfaces
            .iter()
            .map(interface_from_proto)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(InterfaceList {
            status,
            items,
            ..Default::default()
        })
    }

    pub async fn create_interface(&self, iface: &Interface) -> Result<Interface> {
        debug!(interface_id = %iface.metadata.id, vni = iface.spec.vni, device = %iface.spec.device, "Creating interface");
        let res = self
            .transport
            .create_interface(create_interface_request(iface))
            .await
            .map_err(transport_error(Kind::Interface, iface.metadata.id.as_str()))?;
        let status = check(res.status.as_ref(), Kind::Interface, iface.metadata.id.as_str())?;

        let mut created = iface.clone();
        created.kind = Kind::Interface;
        created.spec.underlay_route = decode_addr("underlay_route", &res.underlay_route)?;
        created.spec.virtual_function = res.vf.map(VirtualFunction::from);
        created.status = status;
        Ok(created)
    }

    pub async fn delete_interface(&self, id: &str) -> Result<Interface> {
        debug!(interface_id = id, "Deleting interface");
        let res = self
            .transport
            .delete_interface(proto::DeleteInterfaceRequest {
                interface_id: id.as_bytes().to_vec(),
            })
            .await
            .map_err(transport_error(Kind::Interface, id))?;
        let status = check(res.status.as_ref(), Kind::Interface, id)?;
        Ok(Interface {
            metadata: InterfaceMeta { id: id.to_string() },
            status,
            ..Default::default()
        })
    }

    // =========================================================================
    // Virtual IPs
    // =========================================================================

    pub async fn get_virtual_ip(&self, interface_id: &str) -> Result<VirtualIp> {
        debug!(interface_id, "Getting virtual IP");
        let res = self
            .transport
            .get_vip(proto::GetVipRequest {
                interface_id: interface_id.as_bytes().to_vec(),
            })
            .await
            .map_err(transport_error(Kind::VirtualIP, interface_id))?;
        check(res.status.as_ref(), Kind::VirtualIP, interface_id)?;
        Ok(virtual_ip_from_proto(interface_id, &res)?)
    }

    pub async fn create_virtual_ip(&self, vip: &VirtualIp) -> Result<VirtualIp> {
        debug!(interface_id = %vip.metadata.interface_id, ip = ?vip.spec.ip, "Creating virtual IP");
        let res = self
            .transport
            .create_vip(proto::CreateVipRequest {
                interface_id: vip.metadata.interface_id.as_bytes().to_vec(),
                vip_ip: vip.spec.ip.as_ref().map(encode_addr),
            })
            .await
            .map_err(transport_error(Kind::VirtualIP, vip.metadata.interface_id.as_str()))?;
        let status = check(res.status.as_ref(), Kind::VirtualIP, vip.metadata.interface_id.as_str())?;

        let mut created = vip.clone();
        created.kind = Kind::VirtualIP;
        created.spec.underlay_route = decode_addr("underlay_route", &res.underlay_route)?;
        created.status = status;
        Ok(created)
    }

    pub async fn delete_virtual_ip(&self, interface_id: &str) -> Result<VirtualIp> {
        debug!(interface_id, "Deleting virtual IP");
        let res = self
            .transport
            .delete_vip(proto::DeleteVipRequest {
                interface_id: interface_id.as_bytes().to_vec(),
            })
            .await
            .map_err(transport_error(Kind::VirtualIP, interface_id))?;
        let status = check(res.status.as_ref(), Kind::VirtualIP, interface_id)?;
        Ok(VirtualIp {
            metadata: InterfaceScope {
                interface_id: interface_id.to_string(),
            },
            status,
            ..Default::default()
        })
    }

    // =========================================================================
    // Prefixes
    // =========================================================================

    pub async fn list_prefixes(&self, interface_id: &str) -> Result<PrefixList> {
        debug!(interface_id, "Listing prefixes");
        let res = self
            .transport
            .list_prefixes(proto::ListPrefixesRequest {
                interface_id: interface_id.as_bytes().to_vec(),
            })
            .await
            .map_err(transport_error(Kind::PrefixList, interface_id))?;
        let status = check(res.status.as_ref(), Kind::PrefixList, interface_id)?;

        let scope = InterfaceScope {
            interface_id: interface_id.to_string(),
        };
        let items = res
            .prefixes
            .iter()
            .map(|p| -> Result<Prefix> {
                Ok(Prefix {
                    metadata: scope.clone(),
                    spec: prefix_spec_from_proto(p)?,
                    ..Default::default()
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(PrefixList {
            metadata: scope,
            status,
            items,
            ..Default::default()
        })
    }

    pub async fn create_prefix(&self, prefix: &Prefix) -> Result<Prefix> {
        debug!(interface_id = %prefix.metadata.interface_id, prefix = ?prefix.spec.prefix, "Creating prefix");
        let res = self
            .transport
            .create_prefix(proto::CreatePrefixRequest {
                interface_id: prefix.metadata.interface_id.as_bytes().to_vec(),
                prefix: prefix.spec.prefix.as_ref().map(encode_prefix),
            })
            .await
            .map_err(transport_error(Kind::Prefix, prefix.name()))?;
        let status = check(res.status.as_ref(), Kind::Prefix, prefix.name())?;

        let mut created = prefix.clone();
        created.kind = Kind::Prefix;
        created.spec.underlay_route = decode_addr("underlay_route", &res.underlay_route)?;
        created.status = status;
        Ok(created)
    }

    pub async fn delete_prefix(&self, interface_id: &str, prefix: &IpNet) -> Result<Prefix> {
        debug!(interface_id, %prefix, "Deleting prefix");
        let res = self
            .transport
            .delete_prefix(proto::DeletePrefixRequest {
                interface_id: interface_id.as_bytes().to_vec(),
                prefix: Some(encode_prefix(prefix)),
            })
            .await
            .map_err(transport_error(Kind::Prefix, prefix.to_string()))?;
        let status = check(res.status.as_ref(), Kind::Prefix, prefix.to_string())?;
        Ok(Prefix {
            metadata: InterfaceScope {
                interface_id: interface_id.to_string(),
            },
            spec: PrefixSpec {
                prefix: Some(*prefix),
                underlay_route: None,
            },
            status,
            ..Default::default()
        })
    }

    // =========================================================================
    // Routes
    // =========================================================================

    pub async fn list_routes(&self, vni: u32) -> Result<RouteList> {
        debug!(vni, "Listing routes");
        let res = self
            .transport
            .list_routes(proto::ListRoutesRequest { vni })
            .await
            .map_err(transport_error(Kind::RouteList, vni.to_string()))?;
        let status = check(res.status.as_ref(), Kind::RouteList, vni.to_string())?;

        let items = res
            .routes
            .iter()
            .map(|r| route_from_proto(vni, r))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(RouteList {
            metadata: RouteMeta { vni },
            status,
            items,
            ..Default::default()
        })
    }

    pub async fn create_route(&self, route: &Route) -> Result<Route> {
        debug!(vni = route.metadata.vni, route = %route.name(), "Creating route");
        let res = self
            .transport
            .create_route(proto::CreateRouteRequest {
                vni: route.metadata.vni,
                route: Some(route_to_proto(&route.spec)),
            })
            .await
            .map_err(transport_error(Kind::Route, route.name()))?;
        let status = check(res.status.as_ref(), Kind::Route, route.name())?;

        let mut created = route.clone();
        created.kind = Kind::Route;
        created.status = status;
        Ok(created)
    }

    pub async fn delete_route(&self, vni: u32, prefix: &IpNet) -> Result<Route> {
        debug!(vni, %prefix, "Deleting route");
        let spec = RouteSpec {
            prefix: Some(*prefix),
            next_hop: RouteNextHop::default(),
        };
        let route = Route {
            metadata: RouteMeta { vni },
            spec,
            ..Default::default()
        };
        let res = self
            .transport
            .delete_route(proto::DeleteRouteRequest {
                vni,
                route: Some(route_to_proto(&route.spec)),
            })
            .await
            .map_err(transport_error(Kind::Route, route.name()))?;
        let status = check(res.status.as_ref(), Kind::Route, route.name())?;
        Ok(Route { status, ..route })
    }

    // =========================================================================
    // NAT
    // =========================================================================

    pub async fn get_nat(&self, interface_id: &str) -> Result<Nat> {
        debug!(interface_id, "Getting NAT");
        let res = self
            .transport
            .get_nat(proto::GetNatRequest {
                interface_id: interface_id.as_bytes().to_vec(),
            })
            .await
            .map_err(transport_error(Kind::Nat, interface_id))?;
        check(res.status.as_ref(), Kind::Nat, interface_id)?;
        Ok(nat_from_proto(interface_id, &res)?)
    }

    pub async fn create_nat(&self, nat: &Nat) -> Result<Nat> {
        debug!(
            interface_id = %nat.metadata.interface_id,
            min_port = nat.spec.min_port,
            max_port = nat.spec.max_port,
            "Creating NAT"
        );
        let res = self
            .transport
            .create_nat(proto::CreateNatRequest {
                interface_id: nat.metadata.interface_id.as_bytes().to_vec(),
                nat_ip: nat.spec.nat_ip.as_ref().map(encode_addr),
                min_port: nat.spec.min_port,
                max_port: nat.spec.max_port,
            })
            .await
            .map_err(transport_error(Kind::Nat, nat.metadata.interface_id.as_str()))?;
        let status = check(res.status.as_ref(), Kind::Nat, nat.metadata.interface_id.as_str())?;

        let mut created = nat.clone();
        created.kind = Kind::Nat;
        created.spec.underlay_route = decode_addr("underlay_route", &res.underlay_route)?;
        created.status = status;
        Ok(created)
    }

    pub async fn delete_nat(&self, interface_id: &str) -> Result<Nat> {
        debug!(interface_id, "Deleting NAT");
        let res = self
            .transport
            .delete_nat(proto::DeleteNatRequest {
                interface_id: interface_id.as_bytes().to_vec(),
            })
            .await
            .map_err(transport_error(Kind::Nat, interface_id))?;
        let status = check(res.status.as_ref(), Kind::Nat, interface_id)?;
        Ok(Nat {
            metadata: NatMeta {
                interface_id: interface_id.to_string(),
            },
            status,
            ..Default::default()
        })
    }

    pub async fn create_neighbor_nat(&self, nat: &NeighborNat) -> Result<NeighborNat> {
        debug!(nat_ip = ?nat.metadata.nat_ip, vni = nat.spec.vni, "Creating neighbor NAT");
        let res = self
            .transport
            .create_neighbor_nat(proto::CreateNeighborNatRequest {
                nat_ip: nat.metadata.nat_ip.as_ref().map(encode_addr),
                vni: nat.spec.vni,
                min_port: nat.spec.min_port,
                max_port: nat.spec.max_port,
                underlay_route: encode_opt_addr(nat.spec.underlay_route.as_ref()),
            })
            .await
            .map_err(transport_error(Kind::NeighborNat, nat.name()))?;
        let status = check(res.status.as_ref(), Kind::NeighborNat, nat.name())?;

        let mut created = nat.clone();
        created.kind = Kind::NeighborNat;
        created.status = status;
        Ok(created)
    }

    pub async fn delete_neighbor_nat(&self, nat: &NeighborNat) -> Result<NeighborNat> {
        debug!(nat_ip = ?nat.metadata.nat_ip, vni = nat.spec.vni, "Deleting neighbor NAT");
        let res = self
            .transport
            .delete_neighbor_nat(proto::DeleteNeighborNatRequest {
                nat_ip: nat.metadata.nat_ip.as_ref().map(encode_addr),
                vni: nat.spec.vni,
                min_port: nat.spec.min_port,
                max_port: nat.spec.max_port,
            })
            .await
            .map_err(transport_error(Kind::NeighborNat, nat.name()))?;
        let status = check(res.status.as_ref(), Kind::NeighborNat, nat.name())?;
        Ok(NeighborNat {
            kind: Kind::NeighborNat,
            metadata: nat.metadata.clone(),
            spec: NeighborNatSpec::default(),
            status,
        })
    }

    /// NAT translations of `nat_ip`.
    ///
    /// `nat_type` accepts the tokens of [`NatQueryType`]. `Any` queries local
    /// then neighbor entries and returns them in that order; a failure of
    /// either query fails the whole call.
    pub async fn get_nat_info(&self, nat_ip: IpAddr, nat_type: &str) -> Result<NatList> {
        let query: NatQueryType = nat_type.parse()?;
        let types = match query {
            NatQueryType::Any => vec![NatQueryType::Local, NatQueryType::Neighbor],
            single => vec![single],
        };

        let mut status = Status::default();
        let mut items = Vec::new();
        for info_type in types {
            debug!(%nat_ip, nat_type = info_type.as_str(), "Getting NAT info");
            let res = self
                .transport
                .get_nat_info(proto::GetNatInfoRequest {
                    nat_ip: Some(encode_addr(&nat_ip)),
                    nat_info_type: proto::NatInfoType::from(info_type) as i32,
                })
                .await
                .map_err(transport_error(Kind::NatList, nat_ip.to_string()))?;
            status = check(res.status.as_ref(), Kind::NatList, nat_ip.to_string())?;

            if let Some(reported) = decode_ip_address("nat_ip", res.nat_ip.as_ref())? {
                if reported != nat_ip {
                    return Err(Error::InconsistentResponse(format!(
                        "{} NAT info for {} reported VIP {}",
                        info_type, nat_ip, reported
                    )));
                }
            }

            for entry in &res.nat_info_entries {
                items.push(Nat::from(NatInfoEntry::from_proto(nat_ip, entry)?));
            }
        }

        Ok(NatList {
            metadata: NatListMeta {
                nat_ip: Some(nat_ip),
                nat_type: query,
            },
            status,
            items,
            ..Default::default()
        })
    }

    // =========================================================================
    // Firewall rules
    // =========================================================================

    pub async fn list_firewall_rules(&self, interface_id: &str) -> Result<FirewallRuleList> {
        debug!(interface_id, "Listing firewall rules");
        let res = self
            .transport
            .list_firewall_rules(proto::ListFirewallRulesRequest {
                interface_id: interface_id.as_bytes().to_vec(),
            })
            .await
            .map_err(transport_error(Kind::FirewallRuleList, interface_id))?;
        let status = check(res.status.as_ref(), Kind::FirewallRuleList, interface_id)?;

        let items = res
            .rules
            .iter()
            .map(|r| firewall_rule_from_proto(interface_id, r))
            .collect::<Result<Vec<_>>>()?;

        Ok(FirewallRuleList {
            metadata: InterfaceScope {
                interface_id: interface_id.to_string(),
            },
            status,
            items,
            ..Default::default()
        })
    }

    /// Create a firewall rule.
    ///
    /// The direction, action and IP version tokens of `rule` are rewritten to
    /// their canonical form before the call; an unknown token fails without
    /// issuing it.
    pub async fn create_firewall_rule(&self, rule: &mut FirewallRule) -> Result<FirewallRule> {
        let wire = firewall_rule_to_proto(rule)?;
        debug!(
            interface_id = %rule.metadata.interface_id,
            rule_id = %rule.spec.rule_id,
            direction = %rule.spec.traffic_direction,
            action = %rule.spec.firewall_action,
            "Creating firewall rule"
        );
        let res = self
            .transport
            .create_firewall_rule(proto::CreateFirewallRuleRequest {
                interface_id: rule.metadata.interface_id.as_bytes().to_vec(),
                rule: Some(wire),
            })
            .await
            .map_err(transport_error(Kind::FirewallRule, rule.name()))?;
        let status = check(res.status.as_ref(), Kind::FirewallRule, rule.name())?;

        let mut created = rule.clone();
        created.kind = Kind::FirewallRule;
        if !res.rule_id.is_empty() {
            created.spec.rule_id = String::from_utf8_lossy(&res.rule_id).into_owned();
        }
        created.status = status;
        Ok(created)
    }

    pub async fn get_firewall_rule(&self, interface_id: &str, rule_id: &str) -> Result<FirewallRule> {
        debug!(interface_id, rule_id, "Getting firewall rule");
        let name = format!("{}/{}", interface_id, rule_id);
        let res = self
            .transport
            .get_firewall_rule(proto::GetFirewallRuleRequest {
                interface_id: interface_id.as_bytes().to_vec(),
                rule_id: rule_id.as_bytes().to_vec(),
            })
            .await
            .map_err(transport_error(Kind::FirewallRule, name.as_str()))?;
        let status = check(res.status.as_ref(), Kind::FirewallRule, name.as_str())?;

        let mut rule = match &res.rule {
            Some(wire) => firewall_rule_from_proto(interface_id, wire)?,
            None => {
                return Err(Error::InconsistentResponse(format!(
                    "firewall rule {} missing from successful response",
                    name
                )))
            }
        };
        rule.status = status;
        Ok(rule)
    }

    pub async fn delete_firewall_rule(&self, interface_id: &str, rule_id: &str) -> Result<FirewallRule> {
        debug!(interface_id, rule_id, "Deleting firewall rule");
        let rule = FirewallRule {
            metadata: InterfaceScope {
                interface_id: interface_id.to_string(),
            },
            spec: FirewallRuleSpec {
                rule_id: rule_id.to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let res = self
            .transport
            .delete_firewall_rule(proto::DeleteFirewallRuleRequest {
                interface_id: interface_id.as_bytes().to_vec(),
                rule_id: rule_id.as_bytes().to_vec(),
            })
            .await
            .map_err(transport_error(Kind::FirewallRule, rule.name()))?;
        let status = check(res.status.as_ref(), Kind::FirewallRule, rule.name())?;
        Ok(FirewallRule { status, ..rule })
    }

    // =========================================================================
    // Service state
    // =========================================================================

    pub async fn initialize(&self) -> Result<Initialized> {
        debug!("Initializing dataplane");
        let res = self
            .transport
            .initialize(proto::InitializeRequest {})
            .await
            .map_err(transport_error(Kind::Initialized, "initialized"))?;
        let status = check(res.status.as_ref(), Kind::Initialized, "initialized")?;
        Ok(Initialized {
            spec: InitializedSpec { uuid: res.uuid },
            status,
            ..Default::default()
        })
    }

    pub async fn check_initialized(&self) -> Result<Initialized> {
        debug!("Checking dataplane initialization");
        let res = self
            .transport
            .check_initialized(proto::CheckInitializedRequest {})
            .await
            .map_err(transport_error(Kind::Initialized, "initialized"))?;
        let status = check(res.status.as_ref(), Kind::Initialized, "initialized")?;
        Ok(Initialized {
            spec: InitializedSpec { uuid: res.uuid },
            status,
            ..Default::default()
        })
    }

    /// Exchange client and service versions.
    pub async fn get_version(&self, version: &Version) -> Result<Version> {
        debug!(
            client_name = %version.metadata.client_name,
            client_protocol = %version.metadata.client_protocol,
            "Checking version"
        );
        let res = self
            .transport
            .check_version(proto::CheckVersionRequest {
                protocol_version: version.metadata.client_protocol.clone(),
                client_name: version.metadata.client_name.clone(),
                client_version: version.metadata.client_version.clone(),
            })
            .await
            .map_err(transport_error(Kind::Version, version.name()))?;
        let status = check(res.status.as_ref(), Kind::Version, version.name())?;
        Ok(Version {
            kind: Kind::Version,
            metadata: version.metadata.clone(),
            spec: VersionSpec {
                service_protocol: res.protocol_version,
                service_version: res.service_version,
            },
            status,
        })
    }

    /// Whether `vni` is in use. `vni_type`: 0 = IPv4, 1 = IPv6, 2 = both.
    pub async fn get_vni(&self, vni: u32, vni_type: u8) -> Result<Vni> {
        debug!(vni, vni_type, "Checking VNI");
        let res = self
            .transport
            .check_vni_in_use(proto::CheckVniInUseRequest {
                vni,
                r#type: i32::from(vni_type),
            })
            .await
            .map_err(transport_error(Kind::Vni, vni.to_string()))?;
        let status = check(res.status.as_ref(), Kind::Vni, vni.to_string())?;
        Ok(Vni {
            metadata: VniMeta { vni, vni_type },
            spec: VniSpec { in_use: res.in_use },
            status,
            ..Default::default()
        })
    }

    pub async fn reset_vni(&self, vni: u32, vni_type: u8) -> Result<Vni> {
        debug!(vni, vni_type, "Resetting VNI");
        let res = self
            .transport
            .reset_vni(proto::ResetVniRequest {
                vni,
                r#type: i32::from(vni_type),
            })
            .await
            .map_err(transport_error(Kind::Vni, vni.to_string()))?;
        let status = check(res.status.as_ref(), Kind::Vni, vni.to_string())?;
        Ok(Vni {
            metadata: VniMeta { vni, vni_type },
            status,
            ..Default::default()
        })
    }
}
