//! Iterative resolution engine.
//!
//! This module implements the delegation walk that turns a domain name into
//! an A-record address without an upstream recursive resolver. Starting from
//! a root server, the engine queries each suffix of the name (shortest
//! first) for NS records and follows whatever the response offers: glue
//! addresses, CNAME redirections, SOA master names, or bare authority names
//! that must themselves be resolved first.

use futures::future::BoxFuture;
use futures::FutureExt;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use rand::Rng;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::ResolveError;
use crate::metrics::{self, DelegationRow};
use crate::overrides::StaticOverrides;
use crate::transport::Exchanger;

/// The 13 IANA root servers, IPv4 addresses.
///
/// Every delegation walk starts at one of these, chosen at random.
pub const ROOT_SERVERS: [Ipv4Addr; 13] = [
    Ipv4Addr::new(198, 41, 0, 4),     // a.root-servers.net
    Ipv4Addr::new(199, 9, 14, 201),   // b.root-servers.net
    Ipv4Addr::new(192, 33, 4, 12),    // c.root-servers.net
    Ipv4Addr::new(199, 7, 91, 13),    // d.root-servers.net
    Ipv4Addr::new(192, 203, 230, 10), // e.root-servers.net
    Ipv4Addr::new(192, 5, 5, 241),    // f.root-servers.net
    Ipv4Addr::new(192, 112, 36, 4),   // g.root-servers.net
    Ipv4Addr::new(198, 97, 190, 53),  // h.root-servers.net
    Ipv4Addr::new(192, 36, 148, 17),  // i.root-servers.net
    Ipv4Addr::new(192, 58, 128, 30),  // j.root-servers.net
    Ipv4Addr::new(193, 0, 14, 129),   // k.root-servers.net
    Ipv4Addr::new(199, 7, 83, 42),    // l.root-servers.net
    Ipv4Addr::new(202, 12, 27, 33),   // m.root-servers.net
];

/// Maximum upstream sends per top-level resolve.
pub const WORK_BUDGET: u32 = 100;

/// Chooses one index out of `len` candidates.
///
/// The engine picks root servers, glue addresses, authority names, and CNAME
/// targets through this trait so tests can pin the choice.
pub trait Selector: Send + Sync {
    /// Return an index in `0..len`. `len` is always at least 1.
    fn pick(&self, len: usize) -> usize;
}

/// Uniformly random selection.
#[derive(Debug, Default)]
pub struct RandomSelector;

impl Selector for RandomSelector {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Normalize a domain name for storage and comparison.
///
/// Trims whitespace, strips the trailing dot, lowercases ASCII.
pub(crate) fn normalize(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Suffixes of a normalized name, shortest to longest.
///
/// `a.b.example.com` yields `[com, example.com, b.example.com,
/// a.b.example.com]`. The empty root label is not included.
fn suffixes(domain: &str) -> Vec<String> {
    let labels: Vec<&str> = domain.split('.').filter(|l| !l.is_empty()).collect();
    let mut out = Vec::with_capacity(labels.len());
    let mut current = String::new();

    for label in labels.iter().rev() {
        if current.is_empty() {
            current = (*label).to_string();
        } else {
            current = format!("{}.{}", label, current);
        }
        out.push(current.clone());
    }

    out
}

/// Scratch state for one top-level resolve.
///
/// Holds the glue cache and the send counter. Never shared between
/// concurrent resolutions; recursive top-level resolves get a fresh one.
struct Walk {
    /// name → address learned from additional-section glue.
    glue: HashMap<String, Ipv4Addr>,
    /// Upstream sends so far, cache hits included.
    sends: u32,
}

impl Walk {
    fn new() -> Self {
        Self {
            glue: HashMap::new(),
            sends: 0,
        }
    }
}

/// What one NS response offered, bucketed for the classification table.
#[derive(Debug, Default)]
struct Delegation {
    /// NS targets whose owner name equals the queried suffix.
    authority_names: Vec<String>,
    /// Glue addresses for those targets, from the additional section.
    glue_addrs: Vec<Ipv4Addr>,
    /// SOA master names from the authority section, in list order.
    soa_masters: Vec<String>,
    /// CNAME targets from the answer section.
    cname_targets: Vec<String>,
}

/// Recursive resolution engine.
///
/// Holds the static overrides and the upstream transport; all per-query
/// state lives on the stack of each `resolve` call, so one engine serves
/// any number of concurrent queries.
pub struct Resolver {
    overrides: Arc<StaticOverrides>,
    upstream: Arc<dyn Exchanger>,
    selector: Box<dyn Selector>,
}

impl Resolver {
    /// Create an engine with uniformly random selection.
    pub fn new(overrides: Arc<StaticOverrides>, upstream: Arc<dyn Exchanger>) -> Self {
        Self {
            overrides,
            upstream,
            selector: Box::new(RandomSelector),
        }
    }

    /// Replace the selector, e.g. with a deterministic one for tests.
    pub fn with_selector(mut self, selector: Box<dyn Selector>) -> Self {
        self.selector = selector;
        self
    }

    /// Resolve a domain name to an A-record address.
    ///
    /// Checks the static overrides first; otherwise walks the hierarchy from
    /// a root server. At most [`WORK_BUDGET`] upstream queries are issued on
    /// behalf of this call.
    pub async fn resolve(&self, domain: &str) -> Result<Ipv4Addr, ResolveError> {
        let domain = normalize(domain);

        if let Some(address) = self.overrides.lookup(&domain) {
            info!(%domain, %address, "served from static overrides");
            metrics::record_override_hit();
            return Ok(address);
        }

        let mut walk = Walk::new();
        let (authority, answer) = self.resolve_authority(&mut walk, &domain).await?;

        let address = match answer {
            Some(address) => address,
            None => self.resolve_final_a(&mut walk, &domain, authority).await?,
        };

        info!(%domain, %address, sends = walk.sends, "resolved");
        Ok(address)
    }

    /// Walk the suffix list of `domain` towards its authoritative server.
    ///
    /// Returns the last authority reached and, when a terminating CNAME
    /// branch was taken, the answer itself.
    fn resolve_authority<'a>(
        &'a self,
        walk: &'a mut Walk,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<(Ipv4Addr, Option<Ipv4Addr>), ResolveError>> {
        async move {
        let mut authority = *self.choose(&ROOT_SERVERS);

        for part in suffixes(domain) {
            debug!(%domain, suffix = %part, %authority, "delegation query");
            let response = self.send_query(walk, &part, RecordType::NS, authority).await?;
            let delegation = classify(&response, &part, walk);

            if !delegation.glue_addrs.is_empty() {
                authority = *self.choose(&delegation.glue_addrs);
                debug!(suffix = %part, %authority, "followed glue");
                metrics::record_delegation_step(DelegationRow::Glue);
                continue;
            }

            if !delegation.cname_targets.is_empty() {
                let target = self.choose(&delegation.cname_targets).clone();

                if let Some(master) = delegation.soa_masters.first() {
                    debug!(suffix = %part, %target, %master, "cname with soa");
                    metrics::record_delegation_step(DelegationRow::CnameWithSoa);
                    let soa_authority =
                        self.resolve_soa_master(walk, master, &part, authority).await?;
                    let answer = self.resolve_final_a(walk, &target, soa_authority).await?;
                    return Ok((soa_authority, Some(answer)));
                }

                debug!(suffix = %part, %target, "cname without soa");
                metrics::record_delegation_step(DelegationRow::Cname);
                let (target_authority, answer) =
                    self.resolve_authority(walk, &target).await?;
                let answer = match answer {
                    Some(address) => address,
                    None => self.resolve_final_a(walk, &target, target_authority).await?,
                };
                return Ok((target_authority, Some(answer)));
            }

            if let Some(master) = delegation.soa_masters.first() {
                debug!(suffix = %part, %master, "soa without glue");
                metrics::record_delegation_step(DelegationRow::Soa);
                authority = self.resolve_soa_master(walk, master, &part, authority).await?;
                continue;
            }

            if !delegation.authority_names.is_empty() {
                let name = self.choose(&delegation.authority_names).clone();
                debug!(suffix = %part, authority_name = %name, "authority without glue");
                metrics::record_delegation_step(DelegationRow::AuthorityName);
                authority = self.resolve(&name).boxed().await?;
                continue;
            }

            warn!(%domain, suffix = %part, %authority, "no delegation data");
            return Err(ResolveError::ResolveFailed(format!(
                "no delegation data for {}",
                part
            )));
        }

        Ok((authority, None))
        }
        .boxed()
    }

    /// Resolve an SOA master name to an address.
    ///
    /// Prefers glue learned earlier in this walk; a master equal to the
    /// current suffix reuses the current authority instead of recursing
    /// into itself.
    async fn resolve_soa_master(
        &self,
        walk: &mut Walk,
        master: &str,
        part: &str,
        authority: Ipv4Addr,
    ) -> Result<Ipv4Addr, ResolveError> {
        if let Some(address) = walk.glue.get(master) {
            return Ok(*address);
        }
        if master == part {
            return Ok(authority);
        }
        self.resolve(master).boxed().await
    }

    /// Ask `authority` directly for the address of `domain`.
    async fn resolve_final_a(
        &self,
        walk: &mut Walk,
        domain: &str,
        authority: Ipv4Addr,
    ) -> Result<Ipv4Addr, ResolveError> {
        let question_type = RecordType::A;
        let response = self.send_query(walk, domain, question_type, authority).await?;

        // The answer filter keys on the question's record type; through the
        // A-only front-end the two are identical.
        let addresses: Vec<Ipv4Addr> = response
            .answers()
            .iter()
            .filter(|r| r.record_type() == question_type)
            .filter_map(|r| match r.data() {
                RData::A(a) => Some(Ipv4Addr::from(*a)),
                _ => None,
            })
            .collect();

        if !addresses.is_empty() {
            return Ok(*self.choose(&addresses));
        }

        let has_soa = response
            .name_servers()
            .iter()
            .any(|r| r.record_type() == RecordType::SOA);
        if has_soa {
            // The authority claims the zone but answered no address; its own
            // address is the best resolution available.
            debug!(%domain, %authority, "answerless authority, returning authority address");
            return Ok(authority);
        }

        warn!(%domain, %authority, "no A records");
        Err(ResolveError::ResolveFailed("no A records".to_string()))
    }

    /// Issue one upstream query, charging it against the work budget.
    async fn send_query(
        &self,
        walk: &mut Walk,
        name: &str,
        record_type: RecordType,
        authority: Ipv4Addr,
    ) -> Result<Message, ResolveError> {
        walk.sends += 1;
        if walk.sends > WORK_BUDGET {
            metrics::record_budget_exhausted();
            return Err(ResolveError::Overrun { limit: WORK_BUDGET });
        }

        let query = build_query(name, record_type)?;
        self.upstream.exchange(&query, authority).await
    }

    fn choose<'a, T>(&self, candidates: &'a [T]) -> &'a T {
        &candidates[self.selector.pick(candidates.len())]
    }
}

/// Bucket an NS response for the classification table.
///
/// Glue addresses are written into the walk's cache as they are discovered,
/// before the next suffix is processed.
fn classify(response: &Message, part: &str, walk: &mut Walk) -> Delegation {
    let mut delegation = Delegation::default();

    for record in response.answers().iter().chain(response.name_servers()) {
        if record.record_type() != RecordType::NS {
            continue;
        }
        if normalize(&record.name().to_string()) != part {
            continue;
        }
        if let RData::NS(ns) = record.data() {
            let target = normalize(&ns.0.to_string());
            if !delegation.authority_names.contains(&target) {
                delegation.authority_names.push(target);
            }
        }
    }

    for record in response.additionals() {
        if let RData::A(a) = record.data() {
            let owner = normalize(&record.name().to_string());
            if delegation.authority_names.contains(&owner) {
                let address = Ipv4Addr::from(*a);
                walk.glue.insert(owner, address);
                delegation.glue_addrs.push(address);
            }
        }
    }

    for record in response.name_servers() {
        if let RData::SOA(soa) = record.data() {
            delegation.soa_masters.push(normalize(&soa.mname().to_string()));
        }
    }

    for record in response.answers() {
        if let RData::CNAME(cname) = record.data() {
            delegation.cname_targets.push(normalize(&cname.0.to_string()));
        }
    }

    delegation
}

/// Build a single-question query message.
fn build_query(name: &str, record_type: RecordType) -> Result<Message, ResolveError> {
    let mut query = Query::new();
    query.set_name(Name::from_ascii(name)?);
    query.set_query_type(record_type);
    query.set_query_class(DNSClass::IN);

    let mut message = Message::new();
    message.set_message_type(MessageType::Query);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(false);
    message.add_query(query);

    Ok(message)
}
