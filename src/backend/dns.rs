//! DNS SRV 解析后端
//!
//! 将 RFC 2782 风格的 SRV 查询翻译为实例记录。DNS 不携带健康信号，
//! 所有解析出的记录都视为健康。配置了降级开关时，查询无可用记录或
//! 失败会合成一个指向渲染后 FQDN 的单实例，让发现退化为"把 DNS 名
//! 当作单个可达端点"而不是直接失败。

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};

use crate::backend::ResolverBackend;
use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, Result};
use crate::instance::{Health, Instance};

/// 查询目标域名模板
///
/// `{service}` 占位符在渲染时替换为逻辑服务名，其余部分原样保留。
/// 未知占位符和不配对的大括号在解析时报错。
#[derive(Debug, Clone)]
pub struct NameTemplate {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    ServiceName,
}

impl NameTemplate {
    /// 解析模板字符串
    pub fn parse(template: &str) -> Result<Self> {
        let invalid = |reason: &str| DiscoveryError::InvalidNameTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars();
        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut key = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        key.push(c);
                    }
                    if !closed {
                        return Err(invalid("unclosed '{'"));
                    }
                    if key != "service" {
                        return Err(invalid(&format!("unknown placeholder {{{}}}", key)));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::ServiceName);
                }
                '}' => return Err(invalid("unmatched '}'")),
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    /// 用逻辑服务名渲染目标域名
    pub fn render(&self, service_name: &str) -> String {
        let mut out = String::with_capacity(self.raw.len() + service_name.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::ServiceName => out.push_str(service_name),
            }
        }
        out
    }

    /// 原始模板字符串
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// DNS SRV 解析后端
///
/// 每次调用无状态，只持有静态配置和解析器句柄。
#[derive(Debug)]
pub struct DnsSrvBackend {
    resolver: TokioAsyncResolver,
    template: NameTemplate,
    srv_service: Option<String>,
    srv_proto: Option<String>,
    fallback_to_fqdn: bool,
}

impl DnsSrvBackend {
    /// 从配置创建 DNS SRV 后端
    ///
    /// 模板或 DNS 服务器地址无效时立即失败（配置错误，不可重试）。
    pub fn new(config: &DiscoveryConfig) -> Result<Self> {
        let template = NameTemplate::parse(&config.name_template)?;
        let resolver = build_resolver(config.dns_server.as_deref())?;

        Ok(Self {
            resolver,
            template,
            srv_service: config.srv_service.clone(),
            srv_proto: config.srv_proto.clone(),
            fallback_to_fqdn: config.fallback_to_fqdn,
        })
    }

    /// 实际发往解析器的查询名
    ///
    /// service 和 proto 标签同时设置时为 `_<service>._<proto>.<目标>`，
    /// 否则直接查询渲染后的目标。
    pub fn query_name(&self, service_name: &str) -> String {
        let target = self.template.render(service_name);
        match (&self.srv_service, &self.srv_proto) {
            (Some(svc), Some(proto)) => format!("_{}._{}.{}", svc, proto, target),
            _ => target,
        }
    }

    /// 合成降级实例
    ///
    /// 以渲染后的 FQDN 为 ID 和地址，端口 0，健康状态 Passing。
    /// 同一服务名重复合成得到相同 ID。
    pub fn fallback_instance(&self, service_name: &str) -> Instance {
        let fqdn = self.template.render(service_name);
        Instance::new(service_name, fqdn.clone(), 0)
            .with_id(fqdn)
            .with_health(Health::Passing)
            .with_meta("fallback", "true")
    }
}

#[async_trait]
impl ResolverBackend for DnsSrvBackend {
    async fn resolve(&self, service_name: &str) -> Result<Vec<Instance>> {
        let query = self.query_name(service_name);

        let lookup = match self.resolver.srv_lookup(query.clone()).await {
            Ok(lookup) => lookup,
            Err(e) if self.fallback_to_fqdn => {
                tracing::debug!(
                    service = service_name,
                    query = %query,
                    error = %e,
                    "SRV lookup failed, falling back to FQDN instance"
                );
                return Ok(vec![self.fallback_instance(service_name)]);
            }
            Err(e) => return Err(DiscoveryError::Resolve(e.to_string())),
        };

        let mut instances = Vec::new();
        for srv in lookup.iter() {
            let host = srv.target().to_utf8();
            let host = host.trim_end_matches('.').to_string();
            let mut instance = Instance::new(service_name, host, srv.port())
                .with_health(Health::Passing)
                .with_meta("srv-name", query.as_str())
                .with_meta("srv-priority", srv.priority().to_string())
                .with_meta("srv-weight", srv.weight().to_string())
                .with_raw_entry(format!("{:?}", srv));
            if let Some(svc) = &self.srv_service {
                instance = instance.with_meta("srv-service", svc.as_str());
            }
            if let Some(proto) = &self.srv_proto {
                instance = instance.with_meta("srv-proto", proto.as_str());
            }
            instances.push(instance);
        }

        if instances.is_empty() && self.fallback_to_fqdn {
            return Ok(vec![self.fallback_instance(service_name)]);
        }

        Ok(instances)
    }
}

/// 构建解析器：有覆盖地址时直连该服务器（UDP），否则使用系统配置
fn build_resolver(dns_server: Option<&str>) -> Result<TokioAsyncResolver> {
    match dns_server {
        Some(address) => {
            let socket_addr = parse_dns_server(address)?;
            let mut config = ResolverConfig::new();
            config.add_name_server(NameServerConfig::new(socket_addr, Protocol::Udp));
            Ok(TokioAsyncResolver::tokio(config, ResolverOpts::default()))
        }
        None => TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|e| DiscoveryError::Resolve(e.to_string())),
    }
}

/// 解析 DNS 服务器地址，缺省端口 53
fn parse_dns_server(address: &str) -> Result<SocketAddr> {
    if let Ok(addr) = SocketAddr::from_str(address) {
        return Ok(addr);
    }
    if let Ok(ip) = IpAddr::from_str(address) {
        return Ok(SocketAddr::new(ip, 53));
    }
    Err(DiscoveryError::InvalidDnsServer {
        address: address.to_string(),
        reason: "expected 'ip' or 'ip:port'".to_string(),
    })
}
