//! In-memory dataplane used by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tonic::Status;

use dpservice_client::errors::codes;
use dpservice_client::proto;
use dpservice_client::DpdkService;

type RpcResult<T> = Result<T, Status>;

fn ok() -> Option<proto::Status> {
    Some(proto::Status {
        code: 0,
        message: String::new(),
    })
}

fn err(code: i32, message: &str) -> Option<proto::Status> {
    Some(proto::Status {
        code,
        message: message.to_string(),
    })
}

fn addr(s: &str) -> proto::IpAddress {
    let ipver = if s.contains(':') {
        proto::IpVersion::Ipv6
    } else {
        proto::IpVersion::Ipv4
    };
    proto::IpAddress {
        ipver: ipver as i32,
        address: s.as_bytes().to_vec(),
    }
}

fn same_prefix(a: &proto::Prefix, b: &proto::Prefix) -> bool {
    a.ip == b.ip && a.length == b.length
}

#[derive(Default)]
struct State {
    calls: Vec<String>,
    fail: HashMap<String, Status>,
    next_underlay: u32,
    uuid: Option<String>,
    interfaces: Vec<proto::Interface>,
    vips: HashMap<Vec<u8>, (proto::IpAddress, Vec<u8>)>,
    routes: HashMap<u32, Vec<proto::Route>>,
    firewall_rules: Vec<(Vec<u8>, proto::FirewallRule)>,
    prefixes: Vec<(Vec<u8>, proto::Prefix)>,
    lb_prefixes: Vec<(Vec<u8>, proto::Prefix)>,
    load_balancers: Vec<(Vec<u8>, proto::GetLoadBalancerResponse)>,
    lb_targets: Vec<(Vec<u8>, proto::IpAddress)>,
    nats: Vec<(Vec<u8>, proto::GetNatResponse)>,
    neighbor_nats: Vec<proto::CreateNeighborNatRequest>,
    nat_info: HashMap<i32, Vec<proto::NatInfoEntry>>,
    nat_info_vip: Option<String>,
    vnis_in_use: Vec<u32>,
}

impl State {
    fn has_interface(&self, id: &[u8]) -> bool {
        self.interfaces.iter().any(|i| i.id == id)
    }

    fn has_load_balancer(&self, id: &[u8]) -> bool {
        self.load_balancers.iter().any(|(lb, _)| lb == id)
    }

    fn allocate_underlay(&mut self) -> Vec<u8> {
        self.next_underlay += 1;
        format!("fc00:1::8000:0:{:x}", self.next_underlay).into_bytes()
    }

    /// NAT info entries derived from the configured NAT ranges.
    fn nat_info_entries(&self, nat_ip: Option<&proto::IpAddress>, info_type: i32) -> Vec<proto::NatInfoEntry> {
        if info_type == proto::NatInfoType::Local as i32 {
            self.nats
                .iter()
                .filter(|(_, nat)| nat.nat_ip.as_ref() == nat_ip)
                .filter_map(|(id, nat)| {
                    let iface = self.interfaces.iter().find(|i| i.id == *id)?;
                    Some(proto::NatInfoEntry {
                        address: Some(addr(&String::from_utf8_lossy(&iface.primary_ipv4))),
                        min_port: nat.min_port,
                        max_port: nat.max_port,
                        underlay_route: nat.underlay_route.clone(),
                        vni: iface.vni,
                    })
                })
                .collect()
        } else {
            self.neighbor_nats
                .iter()
                .filter(|n| n.nat_ip.as_ref() == nat_ip)
                .map(|n| proto::NatInfoEntry {
                    address: None,
                    min_port: n.min_port,
                    max_port: n.max_port,
                    underlay_route: Vec::new(),
                    vni: n.vni,
                })
                .collect()
        }
    }
}

/// Stateful stand-in for dp-service.
///
/// Duplicate creates and missing lookups answer the domain codes dp-service
/// uses for each resource (`ALREADY_EXISTS`, `ROUTE_EXISTS`, `SNAT_EXISTS`,
/// `NOT_FOUND`, ...). Every RPC is recorded by name; NAT info calls also record the
/// requested type (`GetNatInfo:1`).
#[derive(Default)]
pub struct FakeDataplane {
    state: Mutex<State>,
}

impl FakeDataplane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of `rpc` fail at the transport layer. NAT info calls
    /// can be targeted per type (`GetNatInfo:2`).
    pub fn fail_rpc(&self, rpc: &str, status: Status) {
        self.state.lock().unwrap().fail.insert(rpc.to_string(), status);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    /// Canned entries returned by NAT info queries of one type, replacing the
    /// ones derived from configured NAT ranges.
    pub fn set_nat_info(&self, info_type: proto::NatInfoType, entries: Vec<proto::NatInfoEntry>) {
        self.state
            .lock()
            .unwrap()
            .nat_info
            .insert(info_type as i32, entries);
    }

    /// Report this VIP in NAT info responses instead of echoing the request.
    pub fn set_nat_info_vip(&self, vip: &str) {
        self.state.lock().unwrap().nat_info_vip = Some(vip.to_string());
    }

    pub fn mark_vni_in_use(&self, vni: u32) {
        self.state.lock().unwrap().vnis_in_use.push(vni);
    }

    fn enter(&self, call: &str) -> RpcResult<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.to_string());
        let rpc = call.split(':').next().unwrap_or(call);
        if let Some(status) = state.fail.get(call).or_else(|| state.fail.get(rpc)).cloned() {
            return Err(status);
        }
        Ok(state)
    }
}

pub fn local_entry(ip: &str, min_port: u32, max_port: u32, underlay: &str) -> proto::NatInfoEntry {
    proto::NatInfoEntry {
        address: Some(addr(ip)),
        min_port,
        max_port,
        underlay_route: underlay.as_bytes().to_vec(),
        vni: 0,
    }
}

pub fn neighbor_entry(min_port: u32, max_port: u32, vni: u32) -> proto::NatInfoEntry {
    proto::NatInfoEntry {
        address: None,
        min_port,
        max_port,
        underlay_route: Vec::new(),
        vni,
    }
}

#[async_trait]
impl DpdkService for FakeDataplane {
    async fn check_version(&self, request: proto::CheckVersionRequest) -> RpcResult<proto::CheckVersionResponse> {
        self.enter("CheckVersion")?;
        Ok(proto::CheckVersionResponse {
            status: ok(),
            protocol_version: request.protocol_version,
            service_version: "0.3.1".to_string(),
        })
    }

    async fn initialize(&self, _request: proto::InitializeRequest) -> RpcResult<proto::InitializeResponse> {
        let mut state = self.enter("Initialize")?;
        let uuid = state
            .uuid
            .get_or_insert_with(|| "2d8f6c3e-7b1a-4f9e-9c0d-5a6b7c8d9e0f".to_string())
            .clone();
        Ok(proto::InitializeResponse { status: ok(), uuid })
    }

    async fn check_initialized(
        &self,
        _request: proto::CheckInitializedRequest,
    ) -> RpcResult<proto::CheckInitializedResponse> {
        let state = self.enter("CheckInitialized")?;
        Ok(match &state.uuid {
            Some(uuid) => proto::CheckInitializedResponse {
                status: ok(),
                uuid: uuid.clone(),
            },
            None => proto::CheckInitializedResponse {
                status: err(codes::BAD_REQUEST, "not initialized"),
                uuid: String::new(),
            },
        })
    }

    async fn list_interfaces(&self, _request: proto::ListInterfacesRequest) -> RpcResult<proto::ListInterfacesResponse> {
        let state = self.enter("ListInterfaces")?;
        Ok(proto::ListInterfacesResponse {
            status: ok(),
            interfaces: state.interfaces.clone(),
        })
    }

    async fn get_interface(&self, request: proto::GetInterfaceRequest) -> RpcResult<proto::GetInterfaceResponse> {
        let state = self.enter("GetInterface")?;
        Ok(match state.interfaces.iter().find(|i| i.id == request.interface_id) {
            Some(iface) => proto::GetInterfaceResponse {
                status: ok(),
                interface: Some(iface.clone()),
            },
            None => proto::GetInterfaceResponse {
                status: err(codes::NOT_FOUND, "interface not found"),
                interface: None,
            },
        })
    }

    async fn create_interface(&self, request: proto::CreateInterfaceRequest) -> RpcResult<proto::CreateInterfaceResponse> {
        let mut state = self.enter("CreateInterface")?;
        if state.interfaces.iter().any(|i| i.id == request.interface_id) {
            return Ok(proto::CreateInterfaceResponse {
                status: err(codes::ALREADY_EXISTS, "interface already exists"),
                underlay_route: Vec::new(),
                vf: None,
            });
        }

        let underlay = state.allocate_underlay();
        let primary = |c: &Option<proto::IpConfig>| {
            c.as_ref()
                .map(|c| c.primary_address.clone())
                .unwrap_or_default()
        };
        state.interfaces.push(proto::Interface {
            id: request.interface_id.clone(),
            vni: request.vni,
            primary_ipv4: primary(&request.ipv4_config),
            primary_ipv6: primary(&request.ipv6_config),
            underlay_route: underlay.clone(),
            pci_name: request.device_name.clone(),
        });

        Ok(proto::CreateInterfaceResponse {
            status: ok(),
            underlay_route: underlay,
            vf: Some(proto::VirtualFunction {
                name: request.device_name,
                domain: 0,
                bus: 0,
                slot: 0,
                function: 0,
            }),
        })
    }

    async fn delete_interface(&self, request: proto::DeleteInterfaceRequest) -> RpcResult<proto::DeleteInterfaceResponse> {
        let mut state = self.enter("DeleteInterface")?;
        let before = state.interfaces.len();
        state.interfaces.retain(|i| i.id != request.interface_id);
        let status = if state.interfaces.len() == before {
            err(codes::NOT_FOUND, "interface not found")
        } else {
            ok()
        };
        Ok(proto::DeleteInterfaceResponse { status })
    }

    async fn get_vip(&self, request: proto::GetVipRequest) -> RpcResult<proto::GetVipResponse> {
        let state = self.enter("GetVip")?;
        Ok(match state.vips.get(&request.interface_id) {
            Some((ip, underlay)) => proto::GetVipResponse {
                status: ok(),
                vip_ip: Some(ip.clone()),
                underlay_route: underlay.clone(),
            },
            None => proto::GetVipResponse {
                status: err(codes::SNAT_NO_DATA, "no vip"),
                vip_ip: None,
                underlay_route: Vec::new(),
            },
        })
    }

    async fn create_vip(&self, request: proto::CreateVipRequest) -> RpcResult<proto::CreateVipResponse> {
        let mut state = self.enter("CreateVip")?;
        if !state.has_interface(&request.interface_id) {
            return Ok(proto::CreateVipResponse {
                status: err(codes::NO_VM, "no such interface"),
                underlay_route: Vec::new(),
            });
        }
        if state.vips.contains_key(&request.interface_id) {
            return Ok(proto::CreateVipResponse {
                status: err(codes::SNAT_EXISTS, "vip exists"),
                underlay_route: Vec::new(),
            });
        }
        let underlay = state.allocate_underlay();
        let ip = request.vip_ip.unwrap_or_default();
        state
            .vips
            .insert(request.interface_id, (ip, underlay.clone()));
        Ok(proto::CreateVipResponse {
            status: ok(),
            underlay_route: underlay,
        })
    }

    async fn delete_vip(&self, request: proto::DeleteVipRequest) -> RpcResult<proto::DeleteVipResponse> {
        let mut state = self.enter("DeleteVip")?;
        let status = match state.vips.remove(&request.interface_id) {
            Some(_) => ok(),
            None => err(codes::SNAT_NO_DATA, "no vip"),
        };
        Ok(proto::DeleteVipResponse { status })
    }

    async fn list_prefixes(&self, request: proto::ListPrefixesRequest) -> RpcResult<proto::ListPrefixesResponse> {
        let state = self.enter("ListPrefixes")?;
        Ok(proto::ListPrefixesResponse {
            status: ok(),
            prefixes: state
                .prefixes
                .iter()
                .filter(|(iface, _)| *iface == request.interface_id)
                .map(|(_, p)| p.clone())
                .collect(),
        })
    }

    async fn create_prefix(&self, request: proto::CreatePrefixRequest) -> RpcResult<proto::CreatePrefixResponse> {
        let mut state = self.enter("CreatePrefix")?;
        let mut prefix = request.prefix.unwrap_or_default();
        let code = if !state.has_interface(&request.interface_id) {
            Some((codes::NO_VM, "no such interface"))
        } else if state
            .prefixes
            .iter()
            .any(|(iface, p)| *iface == request.interface_id && same_prefix(p, &prefix))
        {
            Some((codes::ROUTE_EXISTS, "prefix exists"))
        } else {
            None
        };
        if let Some((code, message)) = code {
            return Ok(proto::CreatePrefixResponse {
                status: err(code, message),
                underlay_route: Vec::new(),
            });
        }

        prefix.underlay_route = state.allocate_underlay();
        let underlay_route = prefix.underlay_route.clone();
        state.prefixes.push((request.interface_id, prefix));
        Ok(proto::CreatePrefixResponse {
            status: ok(),
            underlay_route,
        })
    }

    async fn delete_prefix(&self, request: proto::DeletePrefixRequest) -> RpcResult<proto::DeletePrefixResponse> {
        let mut state = self.enter("DeletePrefix")?;
        let prefix = request.prefix.unwrap_or_default();
        let before = state.prefixes.len();
        state
            .prefixes
            .retain(|(iface, p)| !(*iface == request.interface_id && same_prefix(p, &prefix)));
        let status = if state.prefixes.len() == before {
            err(codes::ROUTE_NOT_FOUND, "prefix not found")
        } else {
            ok()
        };
        Ok(proto::DeletePrefixResponse { status })
    }

    async fn list_load_balancer_prefixes(
        &self,
        request: proto::ListLoadBalancerPrefixesRequest,
    ) -> RpcResult<proto::ListLoadBalancerPrefixesResponse> {
        let state = self.enter("ListLoadBalancerPrefixes")?;
        Ok(proto::ListLoadBalancerPrefixesResponse {
            status: ok(),
            prefixes: state
                .lb_prefixes
                .iter()
                .filter(|(iface, _)| *iface == request.interface_id)
                .map(|(_, p)| p.clone())
                .collect(),
        })
    }

    async fn create_load_balancer_prefix(
        &self,
        request: proto::CreateLoadBalancerPrefixRequest,
    ) -> RpcResult<proto::CreateLoadBalancerPrefixResponse> {
        let mut state = self.enter("CreateLoadBalancerPrefix")?;
        let mut prefix = request.prefix.unwrap_or_default();
        let code = if !state.has_interface(&request.interface_id) {
            Some((codes::NO_VM, "no such interface"))
        } else if state
            .lb_prefixes
            .iter()
            .any(|(iface, p)| *iface == request.interface_id && same_prefix(p, &prefix))
        {
            Some((codes::ALREADY_EXISTS, "lb prefix exists"))
        } else {
            None
        };
        if let Some((code, message)) = code {
            return Ok(proto::CreateLoadBalancerPrefixResponse {
                status: err(code, message),
                underlay_route: Vec::new(),
            });
        }

        prefix.underlay_route = state.allocate_underlay();
        let underlay_route = prefix.underlay_route.clone();
        state.lb_prefixes.push((request.interface_id, prefix));
        Ok(proto::CreateLoadBalancerPrefixResponse {
            status: ok(),
            underlay_route,
        })
    }

    async fn delete_load_balancer_prefix(
        &self,
        request: proto::DeleteLoadBalancerPrefixRequest,
    ) -> RpcResult<proto::DeleteLoadBalancerPrefixResponse> {
        let mut state = self.enter("DeleteLoadBalancerPrefix")?;
        let prefix = request.prefix.unwrap_or_default();
        let before = state.lb_prefixes.len();
        state
            .lb_prefixes
            .retain(|(iface, p)| !(*iface == request.interface_id && same_prefix(p, &prefix)));
        let status = if state.lb_prefixes.len() == before {
            err(codes::NOT_FOUND, "lb prefix not found")
        } else {
            ok()
        };
        Ok(proto::DeleteLoadBalancerPrefixResponse { status })
    }

    async fn get_load_balancer(&self, request: proto::GetLoadBalancerRequest) -> RpcResult<proto::GetLoadBalancerResponse> {
        let state = self.enter("GetLoadBalancer")?;
        Ok(
            match state.load_balancers.iter().find(|(id, _)| *id == request.loadbalancer_id) {
                Some((_, lb)) => proto::GetLoadBalancerResponse {
                    status: ok(),
                    ..lb.clone()
                },
                None => proto::GetLoadBalancerResponse {
                    status: err(codes::NOT_FOUND, "load balancer not found"),
                    ..Default::default()
                },
            },
        )
    }

    async fn create_load_balancer(
        &self,
        request: proto::CreateLoadBalancerRequest,
    ) -> RpcResult<proto::CreateLoadBalancerResponse> {
        let mut state = self.enter("CreateLoadBalancer")?;
        if state.has_load_balancer(&request.loadbalancer_id) {
            return Ok(proto::CreateLoadBalancerResponse {
                status: err(codes::ALREADY_EXISTS, "load balancer exists"),
                underlay_route: Vec::new(),
            });
        }

        let underlay_route = state.allocate_underlay();
        state.load_balancers.push((
            request.loadbalancer_id,
            proto::GetLoadBalancerResponse {
                status: None,
                vni: request.vni,
                loadbalanced_ip: request.loadbalanced_ip,
                loadbalanced_ports: request.loadbalanced_ports,
                underlay_route: underlay_route.clone(),
            },
        ));
        Ok(proto::CreateLoadBalancerResponse {
            status: ok(),
            underlay_route,
        })
    }

    async fn delete_load_balancer(
        &self,
        request: proto::DeleteLoadBalancerRequest,
    ) -> RpcResult<proto::DeleteLoadBalancerResponse> {
        let mut state = self.enter("DeleteLoadBalancer")?;
        let before = state.load_balancers.len();
        state.load_balancers.retain(|(id, _)| *id != request.loadbalancer_id);
        let status = if state.load_balancers.len() == before {
            err(codes::NOT_FOUND, "load balancer not found")
        } else {
            state.lb_targets.retain(|(lb, _)| *lb != request.loadbalancer_id);
            ok()
        };
        Ok(proto::DeleteLoadBalancerResponse { status })
    }

    async fn list_load_balancer_targets(
        &self,
        request: proto::ListLoadBalancerTargetsRequest,
    ) -> RpcResult<proto::ListLoadBalancerTargetsResponse> {
        let state = self.enter("ListLoadBalancerTargets")?;
        if !state.has_load_balancer(&request.loadbalancer_id) {
            return Ok(proto::ListLoadBalancerTargetsResponse {
                status: err(codes::NO_LB, "no such load balancer"),
                target_ips: Vec::new(),
            });
        }
        Ok(proto::ListLoadBalancerTargetsResponse {
            status: ok(),
            target_ips: state
                .lb_targets
                .iter()
                .filter(|(lb, _)| *lb == request.loadbalancer_id)
                .map(|(_, ip)| ip.clone())
                .collect(),
        })
    }

    async fn create_load_balancer_target(
        &self,
        request: proto::CreateLoadBalancerTargetRequest,
    ) -> RpcResult<proto::CreateLoadBalancerTargetResponse> {
        let mut state = self.enter("CreateLoadBalancerTarget")?;
        let target = request.target_ip.unwrap_or_default();
        let status = if !state.has_load_balancer(&request.loadbalancer_id) {
            err(codes::NO_LB, "no such load balancer")
        } else if state
            .lb_targets
            .iter()
            .any(|(lb, ip)| *lb == request.loadbalancer_id && *ip == target)
        {
            err(codes::ALREADY_EXISTS, "target exists")
        } else {
            state.lb_targets.push((request.loadbalancer_id, target));
            ok()
        };
        Ok(proto::CreateLoadBalancerTargetResponse { status })
    }

    async fn delete_load_balancer_target(
        &self,
        request: proto::DeleteLoadBalancerTargetRequest,
    ) -> RpcResult<proto::DeleteLoadBalancerTargetResponse> {
        let mut state = self.enter("DeleteLoadBalancerTarget")?;
        let target = request.target_ip.unwrap_or_default();
        let before = state.lb_targets.len();
        state
            .lb_targets
            .retain(|(lb, ip)| !(*lb == request.loadbalancer_id && *ip == target));
        let status = if state.lb_targets.len() == before {
            err(codes::NOT_FOUND, "target not found")
        } else {
            ok()
        };
        Ok(proto::DeleteLoadBalancerTargetResponse { status })
    }

    async fn get_nat(&self, request: proto::GetNatRequest) -> RpcResult<proto::GetNatResponse> {
        let state = self.enter("GetNat")?;
        Ok(match state.nats.iter().find(|(id, _)| *id == request.interface_id) {
            Some((_, nat)) => proto::GetNatResponse {
                status: ok(),
                ..nat.clone()
            },
            None => proto::GetNatResponse {
                status: err(codes::SNAT_NO_DATA, "no nat"),
                ..Default::default()
            },
        })
    }

    async fn create_nat(&self, request: proto::CreateNatRequest) -> RpcResult<proto::CreateNatResponse> {
        let mut state = self.enter("CreateNat")?;
        let code = if !state.has_interface(&request.interface_id) {
            Some((codes::NO_VM, "no such interface"))
        } else if state.nats.iter().any(|(id, _)| *id == request.interface_id) {
            Some((codes::SNAT_EXISTS, "nat exists"))
        } else {
            None
        };
        if let Some((code, message)) = code {
            return Ok(proto::CreateNatResponse {
                status: err(code, message),
                underlay_route: Vec::new(),
            });
        }

        let underlay_route = state.allocate_underlay();
        let vni = state
            .interfaces
            .iter()
            .find(|i| i.id == request.interface_id)
            .map(|i| i.vni)
            .unwrap_or_default();
        state.nats.push((
            request.interface_id,
            proto::GetNatResponse {
                status: None,
                nat_ip: request.nat_ip,
                min_port: request.min_port,
                max_port: request.max_port,
                underlay_route: underlay_route.clone(),
                vni,
            },
        ));
        Ok(proto::CreateNatResponse {
            status: ok(),
            underlay_route,
        })
    }

    async fn delete_nat(&self, request: proto::DeleteNatRequest) -> RpcResult<proto::DeleteNatResponse> {
        let mut state = self.enter("DeleteNat")?;
        let before = state.nats.len();
        state.nats.retain(|(id, _)| *id != request.interface_id);
        let status = if state.nats.len() == before {
            err(codes::SNAT_NO_DATA, "no nat")
        } else {
            ok()
        };
        Ok(proto::DeleteNatResponse { status })
    }

    async fn create_neighbor_nat(
        &self,
        request: proto::CreateNeighborNatRequest,
    ) -> RpcResult<proto::CreateNeighborNatResponse> {
        let mut state = self.enter("CreateNeighborNat")?;
        let exists = state.neighbor_nats.iter().any(|n| {
            n.nat_ip == request.nat_ip
                && n.vni == request.vni
                && n.min_port == request.min_port
                && n.max_port == request.max_port
        });
        if exists {
            return Ok(proto::CreateNeighborNatResponse {
                status: err(codes::ALREADY_EXISTS, "neighbor nat exists"),
            });
        }
        state.neighbor_nats.push(request);
        Ok(proto::CreateNeighborNatResponse { status: ok() })
    }

    async fn delete_neighbor_nat(
        &self,
        request: proto::DeleteNeighborNatRequest,
    ) -> RpcResult<proto::DeleteNeighborNatResponse> {
        let mut state = self.enter("DeleteNeighborNat")?;
        let before = state.neighbor_nats.len();
        state.neighbor_nats.retain(|n| {
            !(n.nat_ip == request.nat_ip
                && n.vni == request.vni
                && n.min_port == request.min_port
                && n.max_port == request.max_port)
        });
        let status = if state.neighbor_nats.len() == before {
            err(codes::NOT_FOUND, "neighbor nat not found")
        } else {
            ok()
        };
        Ok(proto::DeleteNeighborNatResponse { status })
    }

    async fn get_nat_info(&self, request: proto::GetNatInfoRequest) -> RpcResult<proto::GetNatInfoResponse> {
        let state = self.enter(&format!("GetNatInfo:{}", request.nat_info_type))?;
        let nat_ip = match &state.nat_info_vip {
            Some(vip) => Some(addr(vip)),
            None => request.nat_ip.clone(),
        };
        Ok(proto::GetNatInfoResponse {
            status: ok(),
            nat_ip,
            nat_info_type: request.nat_info_type,
            nat_info_entries: match state.nat_info.get(&request.nat_info_type) {
                Some(canned) => canned.clone(),
                None => state.nat_info_entries(request.nat_ip.as_ref(), request.nat_info_type),
            },
        })
    }

    async fn list_routes(&self, request: proto::ListRoutesRequest) -> RpcResult<proto::ListRoutesResponse> {
        let state = self.enter("ListRoutes")?;
        Ok(proto::ListRoutesResponse {
            status: ok(),
            routes: state.routes.get(&request.vni).cloned().unwrap_or_default(),
        })
    }

    async fn create_route(&self, request: proto::CreateRouteRequest) -> RpcResult<proto::CreateRouteResponse> {
        let mut state = self.enter("CreateRoute")?;
        let route = request.route.unwrap_or_default();
        let routes = state.routes.entry(request.vni).or_default();
        if routes.iter().any(|r| r.prefix == route.prefix) {
            return Ok(proto::CreateRouteResponse {
                status: err(codes::ROUTE_EXISTS, "route exists"),
            });
        }
        routes.push(route);
        Ok(proto::CreateRouteResponse { status: ok() })
    }

    async fn delete_route(&self, request: proto::DeleteRouteRequest) -> RpcResult<proto::DeleteRouteResponse> {
        let mut state = self.enter("DeleteRoute")?;
        let prefix = request.route.and_then(|r| r.prefix);
        let routes = state.routes.entry(request.vni).or_default();
        let before = routes.len();
        routes.retain(|r| r.prefix != prefix);
        let status = if routes.len() == before {
            err(codes::ROUTE_NOT_FOUND, "route not found")
        } else {
            ok()
        };
        Ok(proto::DeleteRouteResponse { status })
    }

    async fn list_firewall_rules(
        &self,
        request: proto::ListFirewallRulesRequest,
    ) -> RpcResult<proto::ListFirewallRulesResponse> {
        let state = self.enter("ListFirewallRules")?;
        Ok(proto::ListFirewallRulesResponse {
            status: ok(),
            rules: state
                .firewall_rules
                .iter()
                .filter(|(iface, _)| *iface == request.interface_id)
                .map(|(_, rule)| rule.clone())
                .collect(),
        })
    }

    async fn create_firewall_rule(
        &self,
        request: proto::CreateFirewallRuleRequest,
    ) -> RpcResult<proto::CreateFirewallRuleResponse> {
        let mut state = self.enter("CreateFirewallRule")?;
        let rule = request.rule.unwrap_or_default();
        let exists = state
            .firewall_rules
            .iter()
            .any(|(iface, r)| *iface == request.interface_id && r.id == rule.id);
        if exists {
            return Ok(proto::CreateFirewallRuleResponse {
                status: err(codes::ALREADY_EXISTS, "rule exists"),
                rule_id: Vec::new(),
            });
        }
        let rule_id = rule.id.clone();
        state.firewall_rules.push((request.interface_id, rule));
        Ok(proto::CreateFirewallRuleResponse {
            status: ok(),
            rule_id,
        })
    }

    async fn get_firewall_rule(&self, request: proto::GetFirewallRuleRequest) -> RpcResult<proto::GetFirewallRuleResponse> {
        let state = self.enter("GetFirewallRule")?;
        let rule = state
            .firewall_rules
            .iter()
            .find(|(iface, r)| *iface == request.interface_id && r.id == request.rule_id)
            .map(|(_, r)| r.clone());
        Ok(match rule {
            Some(rule) => proto::GetFirewallRuleResponse {
                status: ok(),
                rule: Some(rule),
            },
            None => proto::GetFirewallRuleResponse {
                status: err(codes::NOT_FOUND, "rule not found"),
                rule: None,
            },
        })
    }

    async fn delete_firewall_rule(
        &self,
        request: proto::DeleteFirewallRuleRequest,
    ) -> RpcResult<proto::DeleteFirewallRuleResponse> {
        let mut state = self.enter("DeleteFirewallRule")?;
        let before = state.firewall_rules.len();
        state
            .firewall_rules
            .retain(|(iface, r)| !(*iface == request.interface_id && r.id == request.rule_id));
        let status = if state.firewall_rules.len() == before {
            err(codes::NOT_FOUND, "rule not found")
        } else {
            ok()
        };
        Ok(proto::DeleteFirewallRuleResponse { status })
    }

    async fn check_vni_in_use(&self, request: proto::CheckVniInUseRequest) -> RpcResult<proto::CheckVniInUseResponse> {
        let state = self.enter("CheckVniInUse")?;
        Ok(proto::CheckVniInUseResponse {
            status: ok(),
            in_use: state.vnis_in_use.contains(&request.vni),
        })
    }

    async fn reset_vni(&self, request: proto::ResetVniRequest) -> RpcResult<proto::ResetVniResponse> {
        let mut state = self.enter("ResetVni")?;
        let before = state.vnis_in_use.len();
        state.vnis_in_use.retain(|v| *v != request.vni);
        let status = if state.vnis_in_use.len() == before {
            err(codes::ALREADY_RESET, "vni already reset")
        } else {
            ok()
        };
        Ok(proto::ResetVniResponse { status })
    }
}
