use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use clap::{Parser, Subcommand};
use ipnet::IpNet;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dpservice_client::api::*;
use dpservice_client::config::DEFAULT_ADDRESS;
use dpservice_client::errors::codes;
use dpservice_client::{Client, ClientConfig, GrpcTransport};

mod output;

use output::*;

#[derive(Parser, Debug)]
#[command(name = "dpservice-cli", version, about = "CLI for the dp-service dataplane", long_about = None)]
struct Cli {
    /// dp-service gRPC address
    #[arg(short, long, env = "DPSERVICE_ADDRESS", default_value = DEFAULT_ADDRESS)]
    address: String,

    /// Per-call timeout in seconds
    #[arg(long, env = "DPSERVICE_TIMEOUT")]
    timeout: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show a single resource
    Get {
        #[command(subcommand)]
        resource: GetResource,
    },

    /// List resources
    List {
        #[command(subcommand)]
        resource: ListResource,
    },

    /// Create a resource
    Create {
        #[command(subcommand)]
        resource: CreateResource,
    },

    /// Delete a resource
    Delete {
        #[command(subcommand)]
        resource: DeleteResource,
    },

    /// Initialize the dataplane (once after service start)
    Init,

    /// Reset service state
    Reset {
        #[command(subcommand)]
        resource: ResetResource,
    },
}

#[derive(Subcommand, Debug)]
enum GetResource {
    Interface {
        /// Interface ID
        id: String,
    },

    #[command(name = "vip")]
    VirtualIp {
        #[arg(long)]
        interface_id: String,
    },

    Nat {
        #[arg(long)]
        interface_id: String,
    },

    #[command(name = "loadbalancer")]
    LoadBalancer {
        /// Load balancer ID
        id: String,
    },

    #[command(name = "firewallrule")]
    FirewallRule {
        #[arg(long)]
        interface_id: String,

        /// Rule ID
        rule_id: String,
    },

    /// Whether a VNI is in use
    Vni {
        vni: u32,

        /// 0 = IPv4, 1 = IPv6, 2 = both
        #[arg(long, default_value = "2")]
        vni_type: u8,
    },

    /// Exchange client and service versions
    Version {
        /// Protocol version reported to the service
        #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
        client_protocol: String,
    },

    Initialized,
}

#[derive(Subcommand, Debug)]
enum ListResource {
    Interfaces,

    Prefixes {
        #[arg(long)]
        interface_id: String,
    },

    #[command(name = "lbprefixes")]
    LoadBalancerPrefixes {
        #[arg(long)]
        interface_id: String,
    },

    Routes {
        #[arg(long)]
        vni: u32,
    },

    #[command(name = "lbtargets")]
    LoadBalancerTargets {
        #[arg(long)]
        lb_id: String,
    },

    #[command(name = "firewallrules")]
    FirewallRules {
        #[arg(long)]
        interface_id: String,
    },

    /// NAT translations of a VIP
    Nat {
        /// NAT VIP
        nat_ip: IpAddr,

        /// any, local or neigh
        #[arg(long, default_value = "any")]
        nat_type: String,
    },
}

#[derive(Subcommand, Debug)]
enum CreateResource {
    Interface {
        /// Interface ID
        id: String,

        #[arg(long)]
        vni: u32,

        /// Device name (e.g. net_tap5)
        #[arg(long)]
        device: String,

        #[arg(long)]
        ipv4: Option<Ipv4Addr>,

        #[arg(long)]
        ipv6: Option<Ipv6Addr>,

        /// PXE next server
        #[arg(long, requires = "pxe_file")]
        pxe_server: Option<String>,

        /// PXE boot file name
        #[arg(long, requires = "pxe_server")]
        pxe_file: Option<String>,
    },

    Prefix {
        #[arg(long)]
        interface_id: String,

        prefix: IpNet,
    },

    #[command(name = "lbprefix")]
    LoadBalancerPrefix {
        #[arg(long)]
        interface_id: String,

        prefix: IpNet,
    },

    Route {
        #[arg(long)]
        vni: u32,

        prefix: IpNet,

        #[arg(long, default_value = "0")]
        next_hop_vni: u32,

        #[arg(long)]
        next_hop_ip: IpAddr,
    },

    #[command(name = "vip")]
    VirtualIp {
        #[arg(long)]
        interface_id: String,

        ip: IpAddr,
    },

    #[command(name = "loadbalancer")]
    LoadBalancer {
        /// Load balancer ID
        id: String,

        #[arg(long)]
        vni: u32,

        #[arg(long)]
        vip: IpAddr,

        /// Comma separated <protocol>/<port> list (e.g. tcp/80,udp/53)
        #[arg(long, value_delimiter = ',')]
        lbports: Vec<LbPort>,
    },

    #[command(name = "lbtarget")]
    LoadBalancerTarget {
        #[arg(long)]
        lb_id: String,

        target_ip: IpAddr,
    },

    Nat {
        #[arg(long)]
        interface_id: String,

        #[arg(long)]
        nat_ip: IpAddr,

        #[arg(long)]
        min_port: u32,

        #[arg(long)]
        max_port: u32,
    },

    #[command(name = "neighbornat")]
    NeighborNat {
        nat_ip: IpAddr,

        #[arg(long)]
        vni: u32,

        #[arg(long)]
        min_port: u32,

        #[arg(long)]
        max_port: u32,

        /// Underlay route of the owning node
        #[arg(long)]
        underlay: IpAddr,
    },

    #[command(name = "firewallrule")]
    FirewallRule(FirewallRuleArgs),
}

#[derive(clap::Args, Debug)]
struct FirewallRuleArgs {
    #[arg(long)]
    interface_id: String,

    /// Rule ID
    rule_id: String,

    /// ingress or egress
    #[arg(long, default_value = "ingress")]
    direction: String,

    /// accept or drop
    #[arg(long, default_value = "accept")]
    action: String,

    #[arg(long, default_value = "1000")]
    priority: u32,

    /// ipv4 or ipv6
    #[arg(long, default_value = "ipv4")]
    ipv: String,

    /// Source prefix (any if unset)
    #[arg(long)]
    src: Option<IpNet>,

    /// Destination prefix (any if unset)
    #[arg(long)]
    dst: Option<IpNet>,

    /// tcp, udp or icmp
    #[arg(long)]
    protocol: Option<String>,

    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    src_port_min: i32,

    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    src_port_max: i32,

    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    dst_port_min: i32,

    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    dst_port_max: i32,

    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    icmp_type: i32,

    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    icmp_code: i32,
}

impl FirewallRuleArgs {
    fn into_rule(self) -> anyhow::Result<FirewallRule> {
        let ports = PortFilter {
            src_port_lower: self.src_port_min,
            src_port_upper: self.src_port_max,
            dst_port_lower: self.dst_port_min,
            dst_port_upper: self.dst_port_max,
        };
        let protocol_filter = match self.protocol.as_deref().map(str::to_lowercase).as_deref() {
            None => None,
            Some("tcp") => Some(ProtocolFilter::Tcp(ports)),
            Some("udp") => Some(ProtocolFilter::Udp(ports)),
            Some("icmp") => Some(ProtocolFilter::Icmp(IcmpFilter {
                icmp_type: self.icmp_type,
                icmp_code: self.icmp_code,
            })),
            Some(other) => anyhow::bail!("Invalid protocol '{}'. Use 'tcp', 'udp' or 'icmp'.", other),
        };

        Ok(FirewallRule {
            metadata: InterfaceScope {
                interface_id: self.interface_id,
            },
            spec: FirewallRuleSpec {
                rule_id: self.rule_id,
                traffic_direction: self.direction,
                firewall_action: self.action,
                priority: self.priority,
                ip_version: self.ipv,
                source_prefix: self.src,
                destination_prefix: self.dst,
                protocol_filter,
            },
            ..Default::default()
        })
    }
}

#[derive(Subcommand, Debug)]
enum DeleteResource {
    Interface {
        /// Interface ID
        id: String,
    },

    Prefix {
        #[arg(long)]
        interface_id: String,

        prefix: IpNet,
    },

    #[command(name = "lbprefix")]
    LoadBalancerPrefix {
        #[arg(long)]
        interface_id: String,

        prefix: IpNet,
    },

    Route {
        #[arg(long)]
        vni: u32,

        prefix: IpNet,
    },

    #[command(name = "vip")]
    VirtualIp {
        #[arg(long)]
        interface_id: String,
    },

    #[command(name = "loadbalancer")]
    LoadBalancer {
        /// Load balancer ID
        id: String,
    },

    #[command(name = "lbtarget")]
    LoadBalancerTarget {
        #[arg(long)]
        lb_id: String,

        target_ip: IpAddr,
    },

    Nat {
        #[arg(long)]
        interface_id: String,
    },

    #[command(name = "neighbornat")]
    NeighborNat {
        nat_ip: IpAddr,

        #[arg(long)]
        vni: u32,

        #[arg(long)]
        min_port: u32,

        #[arg(long)]
        max_port: u32,
    },

    #[command(name = "firewallrule")]
    FirewallRule {
        #[arg(long)]
        interface_id: String,

        /// Rule ID
        rule_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum ResetResource {
    /// Remove all state bound to a VNI
    Vni {
        vni: u32,

        /// 0 = IPv4, 1 = IPv6, 2 = both
        #[arg(long, default_value = "2")]
        vni_type: u8,
    },
}

/// Print a single resource.
macro_rules! show {
    ($format:expr, $value:expr, $row:ty) => {{
        let value = $value;
        emit($format, &value, vec![<$row>::from(&value)], "")
    }};
}

/// Print a list of resources.
macro_rules! show_list {
    ($format:expr, $list:expr, $row:ty, $empty:literal) => {{
        let list = $list;
        let rows: Vec<$row> = list.items.iter().map(<$row>::from).collect();
        emit($format, &list, rows, $empty)
    }};
}

async fn get(client: &Client<GrpcTransport>, format: OutputFormat, resource: GetResource) -> anyhow::Result<()> {
    match resource {
        GetResource::Interface { id } => show!(format, client.get_interface(&id).await?, InterfaceRow),
        GetResource::VirtualIp { interface_id } => {
            show!(format, client.get_virtual_ip(&interface_id).await?, VirtualIpRow)
        }
        GetResource::Nat { interface_id } => show!(format, client.get_nat(&interface_id).await?, NatRow),
        GetResource::LoadBalancer { id } => {
            show!(format, client.get_load_balancer(&id).await?, LoadBalancerRow)
        }
        GetResource::FirewallRule { interface_id, rule_id } => show!(
            format,
            client.get_firewall_rule(&interface_id, &rule_id).await?,
            FirewallRuleRow
        ),
        GetResource::Vni { vni, vni_type } => show!(format, client.get_vni(vni, vni_type).await?, VniRow),
        GetResource::Version { client_protocol } => {
            let request = Version {
                metadata: VersionMeta {
                    client_protocol,
                    client_name: env!("CARGO_PKG_NAME").to_string(),
                    client_version: env!("CARGO_PKG_VERSION").to_string(),
                },
                ..Default::default()
            };
            show!(format, client.get_version(&request).await?, VersionRow)
        }
        GetResource::Initialized => show!(format, client.check_initialized().await?, InitializedRow),
    }
}

async fn list(client: &Client<GrpcTransport>, format: OutputFormat, resource: ListResource) -> anyhow::Result<()> {
    match resource {
        ListResource::Interfaces => {
            show_list!(format, client.list_interfaces().await?, InterfaceRow, "No interfaces found")
        }
        ListResource::Prefixes { interface_id } => show_list!(
            format,
            client.list_prefixes(&interface_id).await?,
            PrefixRow,
            "No prefixes found"
        ),
        ListResource::LoadBalancerPrefixes { interface_id } => show_list!(
            format,
            client.list_load_balancer_prefixes(&interface_id).await?,
            PrefixRow,
            "No load balancer prefixes found"
        ),
        ListResource::Routes { vni } => {
            show_list!(format, client.list_routes(vni).await?, RouteRow, "No routes found")
        }
        ListResource::LoadBalancerTargets { lb_id } => show_list!(
            format,
            client.list_load_balancer_targets(&lb_id).await?,
            LoadBalancerTargetRow,
            "No load balancer targets found"
        ),
        ListResource::FirewallRules { interface_id } => show_list!(
            format,
            client.list_firewall_rules(&interface_id).await?,
            FirewallRuleRow,
            "No firewall rules found"
        ),
        ListResource::Nat { nat_ip, nat_type } => show_list!(
            format,
            client.get_nat_info(nat_ip, &nat_type).await?,
            NatRow,
            "No NAT entries found"
        ),
    }
}

async fn create(client: &Client<GrpcTransport>, format: OutputFormat, resource: CreateResource) -> anyhow::Result<()> {
    match resource {
        CreateResource::Interface {
            id,
            vni,
            device,
            ipv4,
            ipv6,
            pxe_server,
            pxe_file,
        } => {
            let ips = ipv4
                .map(IpAddr::V4)
                .into_iter()
                .chain(ipv6.map(IpAddr::V6))
                .collect();
            let pxe = match (pxe_server, pxe_file) {
                (Some(server), Some(file_name)) => Some(Pxe { server, file_name }),
                _ => None,
            };
            let iface = Interface {
                metadata: InterfaceMeta { id },
                spec: InterfaceSpec {
                    vni,
                    device,
                    ips,
                    pxe,
                    ..Default::default()
                },
                ..Default::default()
            };
            show!(format, client.create_interface(&iface).await?, InterfaceRow)
        }

        CreateResource::Prefix { interface_id, prefix } => {
            let prefix = Prefix {
                metadata: InterfaceScope { interface_id },
                spec: PrefixSpec {
                    prefix: Some(prefix),
                    underlay_route: None,
                },
                ..Default::default()
            };
            show!(format, client.create_prefix(&prefix).await?, PrefixRow)
        }

        CreateResource::LoadBalancerPrefix { interface_id, prefix } => {
            let prefix = LoadBalancerPrefix {
                metadata: InterfaceScope { interface_id },
                spec: PrefixSpec {
                    prefix: Some(prefix),
                    underlay_route: None,
                },
                ..Default::default()
            };
            show!(format, client.create_load_balancer_prefix(&prefix).await?, PrefixRow)
        }

        CreateResource::Route {
            vni,
            prefix,
            next_hop_vni,
            next_hop_ip,
        } => {
            let route = Route {
                metadata: RouteMeta { vni },
                spec: RouteSpec {
                    prefix: Some(prefix),
                    next_hop: RouteNextHop {
                        vni: next_hop_vni,
                        ip: Some(next_hop_ip),
                    },
                },
                ..Default::default()
            };
            show!(format, client.create_route(&route).await?, RouteRow)
        }

        CreateResource::VirtualIp { interface_id, ip } => {
            let vip = VirtualIp {
                metadata: InterfaceScope { interface_id },
                spec: VirtualIpSpec {
                    ip: Some(ip),
                    underlay_route: None,
                },
                ..Default::default()
            };
            show!(format, client.create_virtual_ip(&vip).await?, VirtualIpRow)
        }

        CreateResource::LoadBalancer { id, vni, vip, lbports } => {
            let lb = LoadBalancer {
                metadata: LoadBalancerMeta { id },
                spec: LoadBalancerSpec {
                    vni,
                    lb_vip_ip: Some(vip),
                    lbports,
                    underlay_route: None,
                },
                ..Default::default()
            };
            show!(format, client.create_load_balancer(&lb).await?, LoadBalancerRow)
        }

        CreateResource::LoadBalancerTarget { lb_id, target_ip } => {
            let target = LoadBalancerTarget {
                metadata: LoadBalancerTargetMeta { loadbalancer_id: lb_id },
                spec: LoadBalancerTargetSpec {
                    target_ip: Some(target_ip),
                },
                ..Default::default()
            };
            show!(format, client.create_load_balancer_target(&target).await?, LoadBalancerTargetRow)
        }

        CreateResource::Nat {
            interface_id,
            nat_ip,
            min_port,
            max_port,
        } => {
            let nat = Nat {
                metadata: NatMeta { interface_id },
                spec: NatSpec {
                    nat_ip: Some(nat_ip),
                    min_port,
                    max_port,
                    ..Default::default()
                },
                ..Default::default()
            };
            show!(format, client.create_nat(&nat).await?, NatRow)
        }

        CreateResource::NeighborNat {
            nat_ip,
            vni,
            min_port,
            max_port,
            underlay,
        } => {
            let nat = NeighborNat {
                metadata: NeighborNatMeta { nat_ip: Some(nat_ip) },
                spec: NeighborNatSpec {
                    vni,
                    min_port,
                    max_port,
                    underlay_route: Some(underlay),
                },
                ..Default::default()
            };
            show!(format, client.create_neighbor_nat(&nat).await?, NeighborNatRow)
        }

        CreateResource::FirewallRule(args) => {
            let mut rule = args.into_rule()?;
            show!(format, client.create_firewall_rule(&mut rule).await?, FirewallRuleRow)
        }
    }
}

async fn delete(client: &Client<GrpcTransport>, resource: DeleteResource) -> anyhow::Result<()> {
    let name = match resource {
        DeleteResource::Interface { id } => client.delete_interface(&id).await?.name(),
        DeleteResource::Prefix { interface_id, prefix } => {
            client.delete_prefix(&interface_id, &prefix).await?.name()
        }
        DeleteResource::LoadBalancerPrefix { interface_id, prefix } => client
            .delete_load_balancer_prefix(&interface_id, &prefix)
            .await?
            .name(),
        DeleteResource::Route { vni, prefix } => client.delete_route(vni, &prefix).await?.name(),
        DeleteResource::VirtualIp { interface_id } => client.delete_virtual_ip(&interface_id).await?.name(),
        DeleteResource::LoadBalancer { id } => client.delete_load_balancer(&id).await?.name(),
        DeleteResource::LoadBalancerTarget { lb_id, target_ip } => client
            .delete_load_balancer_target(&lb_id, &target_ip)
            .await?
            .name(),
        DeleteResource::Nat { interface_id } => client.delete_nat(&interface_id).await?.name(),
        DeleteResource::NeighborNat {
            nat_ip,
            vni,
            min_port,
            max_port,
        } => {
            let nat = NeighborNat {
                metadata: NeighborNatMeta { nat_ip: Some(nat_ip) },
                spec: NeighborNatSpec {
                    vni,
                    min_port,
                    max_port,
                    underlay_route: None,
                },
                ..Default::default()
            };
            client.delete_neighbor_nat(&nat).await?.name()
        }
        DeleteResource::FirewallRule { interface_id, rule_id } => client
            .delete_firewall_rule(&interface_id, &rule_id)
            .await?
            .name(),
    };
    println!("Deleted: {}", name);
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ClientConfig::new(cli.address);
    if let Some(secs) = cli.timeout {
        config = config.with_request_timeout(secs);
    }
    debug!(address = %config.address, "Connecting to dp-service");
    let client = Client::connect(&config).await?;
    let format = cli.output;

    match cli.command {
        Commands::Get { resource } => get(&client, format, resource).await,
        Commands::List { resource } => list(&client, format, resource).await,
        Commands::Create { resource } => create(&client, format, resource).await,
        Commands::Delete { resource } => delete(&client, resource).await,
        Commands::Init => show!(format, client.initialize().await?, InitializedRow),
        Commands::Reset {
            resource: ResetResource::Vni { vni, vni_type },
        } => show!(format, client.reset_vni(vni, vni_type).await?, VniRow),
    }
}

/// Process exit code for a failed command.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<dpservice_client::Error>()
        .map(dpservice_client::Error::exit_code)
        .unwrap_or(codes::CLIENT_ERROR)
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "dpservice_cli=info,dpservice_client=info,tonic=warn,tower=warn,hyper=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(exit_code(&e));
    }
}
