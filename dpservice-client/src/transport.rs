//! RPC surface of dp-service.
//!
//! [`DpdkService`] is the seam between the operation client and the wire: one
//! async method per RPC, returning the response message or the transport
//! failure. [`GrpcTransport`] implements it over the generated tonic client.

use async_trait::async_trait;
use tonic::transport::Channel;
use tonic::{Response, Status};

use crate::config::ClientConfig;
use crate::errors::Result;
use crate::proto;

macro_rules! dpdk_service {
    ($( $(#[$doc:meta])* $method:ident($req:ident) -> $res:ident; )*) => {
        /// One method per dp-service RPC.
        #[async_trait]
        pub trait DpdkService: Send + Sync {
            $(
                $(#[$doc])*
                async fn $method(&self, request: proto::$req) -> std::result::Result<proto::$res, Status>;
            )*
        }

        #[async_trait]
        impl DpdkService for GrpcTransport {
            $(
                async fn $method(&self, request: proto::$req) -> std::result::Result<proto::$res, Status> {
                    let mut client = self.inner.clone();
                    client.$method(request).await.map(Response::into_inner)
                }
            )*
        }

        #[async_trait]
        impl<T: DpdkService + ?Sized> DpdkService for std::sync::Arc<T> {
            $(
                async fn $method(&self, request: proto::$req) -> std::result::Result<proto::$res, Status> {
                    (**self).$method(request).await
                }
            )*
        }
    };
}

dpdk_service! {
    check_version(CheckVersionRequest) -> CheckVersionResponse;
    /// Must be called once after the service starts, before anything else.
    initialize(InitializeRequest) -> InitializeResponse;
    check_initialized(CheckInitializedRequest) -> CheckInitializedResponse;

    list_interfaces(ListInterfacesRequest) -> ListInterfacesResponse;
    get_interface(GetInterfaceRequest) -> GetInterfaceResponse;
    create_interface(CreateInterfaceRequest) -> CreateInterfaceResponse;
    delete_interface(DeleteInterfaceRequest) -> DeleteInterfaceResponse;

    get_vip(GetVipRequest) -> GetVipResponse;
    create_vip(CreateVipRequest) -> CreateVipResponse;
    delete_vip(DeleteVipRequest) -> DeleteVipResponse;

    list_prefixes(ListPrefixesRequest) -> ListPrefixesResponse;
    create_prefix(CreatePrefixRequest) -> CreatePrefixResponse;
    delete_prefix(DeletePrefixRequest) -> DeletePrefixResponse;

    list_load_balancer_prefixes(ListLoadBalancerPrefixesRequest) -> ListLoadBalancerPrefixesResponse;
    create_load_balancer_prefix(CreateLoadBalancerPrefixRequest) -> CreateLoadBalancerPrefixResponse;
    delete_load_balancer_prefix(DeleteLoadBalancerPrefixRequest) -> DeleteLoadBalancerPrefixResponse;

    get_load_balancer(GetLoadBalancerRequest) -> GetLoadBalancerResponse;
    create_load_balancer(CreateLoadBalancerRequest) -> CreateLoadBalancerResponse;
    delete_load_balancer(DeleteLoadBalancerRequest) -> DeleteLoadBalancerResponse;

    list_load_balancer_targets(ListLoadBalancerTargetsRequest) -> ListLoadBalancerTargetsResponse;
    create_load_balancer_target(CreateLoadBalancerTargetRequest) -> CreateLoadBalancerTargetResponse;
    delete_load_balancer_target(DeleteLoadBalancerTargetRequest) -> DeleteLoadBalancerTargetResponse;

    get_nat(GetNatRequest) -> GetNatResponse;
    create_nat(CreateNatRequest) -> CreateNatResponse;
    delete_nat(DeleteNatRequest) -> DeleteNatResponse;
    create_neighbor_nat(CreateNeighborNatRequest) -> CreateNeighborNatResponse;
    delete_neighbor_nat(DeleteNeighborNatRequest) -> DeleteNeighborNatResponse;
    /// Entries of one type only; `Any` is resolved by the caller.
    get_nat_info(GetNatInfoRequest) -> GetNatInfoResponse;

    list_routes(ListRoutesRequest) -> ListRoutesResponse;
    create_route(CreateRouteRequest) -> CreateRouteResponse;
    delete_route(DeleteRouteRequest) -> DeleteRouteResponse;

    list_firewall_rules(ListFirewallRulesRequest) -> ListFirewallRulesResponse;
    create_firewall_rule(CreateFirewallRuleRequest) -> CreateFirewallRuleResponse;
    get_firewall_rule(GetFirewallRuleRequest) -> GetFirewallRuleResponse;
    delete_firewall_rule(DeleteFirewallRuleRequest) -> DeleteFirewallRuleResponse;

    check_vni_in_use(CheckVniInUseRequest) -> CheckVniInUseResponse;
    reset_vni(ResetVniRequest) -> ResetVniResponse;
}

/// gRPC transport over a tonic channel.
///
/// Cheap to clone; calls on one transport may run concurrently.
#[derive(Debug, Clone)]
pub struct GrpcTransport {
    inner: proto::DpdKonmetalClient<Channel>,
}

impl GrpcTransport {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: proto::DpdKonmetalClient::new(channel),
        }
    }

    /// Connect to the service described by `config`.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let channel = config.endpoint()?.connect().await?;
        Ok(Self::new(channel))
    }
}
