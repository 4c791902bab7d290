//! Shared test infrastructure for resolution and front-end tests.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Mutex;

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::{A, CNAME, NS, SOA};
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};

use taproot_dns::{Exchanger, ResolveError, Resolver, Selector, StaticOverrides};

// --- Constants ---

/// The root server a `FirstSelector` walk starts from (a.root-servers.net).
pub const FIRST_ROOT: Ipv4Addr = Ipv4Addr::new(198, 41, 0, 4);

// --- Deterministic selection ---

/// Always picks the first candidate.
pub struct FirstSelector;

impl Selector for FirstSelector {
    fn pick(&self, _len: usize) -> usize {
        0
    }
}

// --- ScriptedExchanger ---

/// Exchanger answering from a staged table instead of the network.
///
/// Keys are (question name, question type, authority address); every send is
/// recorded so tests can assert the exact walk the engine performed. An
/// unstaged key returns a transport error, which fails the resolution.
#[derive(Default)]
pub struct ScriptedExchanger {
    responses: Mutex<HashMap<(String, RecordType, Ipv4Addr), Message>>,
    log: Mutex<Vec<(String, RecordType, Ipv4Addr)>>,
}

impl ScriptedExchanger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage the response for one (name, type, authority) key.
    pub fn stage(&self, name: &str, rtype: RecordType, authority: Ipv4Addr, response: Message) {
        self.responses
            .lock()
            .unwrap()
            .insert((name.to_string(), rtype, authority), response);
    }

    /// Number of exchanges performed.
    pub fn sends(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    /// Every exchange performed, in order.
    pub fn sent(&self) -> Vec<(String, RecordType, Ipv4Addr)> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Exchanger for ScriptedExchanger {
    async fn exchange(
        &self,
        query: &Message,
        authority: Ipv4Addr,
    ) -> Result<Message, ResolveError> {
        let question = query.queries().first().expect("query has a question");
        let key = (
            question.name().to_string().trim_end_matches('.').to_string(),
            question.query_type(),
            authority,
        );

        self.log.lock().unwrap().push(key.clone());

        self.responses
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| {
                ResolveError::Config(format!(
                    "unstaged exchange: {} {} @ {}",
                    key.0, key.1, key.2
                ))
            })
    }
}

// --- Resolver construction ---

/// Engine over a scripted exchanger with deterministic selection.
pub fn test_resolver(exchanger: std::sync::Arc<ScriptedExchanger>) -> Resolver {
    test_resolver_with_overrides(exchanger, StaticOverrides::default())
}

/// Same, with static overrides.
pub fn test_resolver_with_overrides(
    exchanger: std::sync::Arc<ScriptedExchanger>,
    overrides: StaticOverrides,
) -> Resolver {
    Resolver::new(std::sync::Arc::new(overrides), exchanger).with_selector(Box::new(FirstSelector))
}

// --- Message construction ---

pub fn name(s: &str) -> Name {
    Name::from_ascii(s).unwrap()
}

pub fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

fn response_shell() -> Message {
    let mut msg = Message::new();
    msg.set_message_type(MessageType::Response);
    msg.set_op_code(OpCode::Query);
    msg
}

/// Referral: NS records for `zone` in the authority section plus glue
/// addresses in the additional section.
pub fn referral(zone: &str, ns_targets: &[&str], glue: &[(&str, Ipv4Addr)]) -> Message {
    let mut msg = response_shell();
    for target in ns_targets {
        msg.add_name_server(Record::from_rdata(
            name(zone),
            300,
            RData::NS(NS(name(target))),
        ));
    }
    for (owner, address) in glue {
        msg.add_additional(Record::from_rdata(
            name(owner),
            300,
            RData::A(A::from(*address)),
        ));
    }
    msg
}

/// Direct answer: A records for `owner` in the answer section.
pub fn answer_a(owner: &str, addresses: &[Ipv4Addr]) -> Message {
    let mut msg = response_shell();
    for address in addresses {
        msg.add_answer(Record::from_rdata(
            name(owner),
            300,
            RData::A(A::from(*address)),
        ));
    }
    msg
}

/// CNAME answer: `owner` redirects to `target`.
pub fn answer_cname(owner: &str, target: &str) -> Message {
    let mut msg = response_shell();
    msg.add_answer(Record::from_rdata(
        name(owner),
        300,
        RData::CNAME(CNAME(name(target))),
    ));
    msg
}

/// Add an SOA record for `zone` with master `mname` to the authority section.
pub fn with_soa(mut msg: Message, zone: &str, mname: &str) -> Message {
    msg.add_name_server(Record::from_rdata(
        name(zone),
        300,
        RData::SOA(SOA::new(
            name(mname),
            name("hostmaster.invalid"),
            1,
            3600,
            600,
            604800,
            60,
        )),
    ));
    msg
}

/// Response with no records at all.
pub fn empty() -> Message {
    response_shell()
}

// --- Query construction (for the UDP loopback tests) ---

/// Build wire-format bytes for a DNS query.
pub fn build_query_bytes(qname: &str, record_type: RecordType, id: u16) -> Vec<u8> {
    let mut msg = Message::new();
    msg.set_id(id);
    msg.set_message_type(MessageType::Query);
    msg.set_op_code(OpCode::Query);
    msg.set_recursion_desired(true);
    let mut query = Query::new();
    query.set_name(name(qname));
    query.set_query_type(record_type);
    query.set_query_class(DNSClass::IN);
    msg.add_query(query);
    msg.to_vec().unwrap()
}

// --- Response helpers ---

/// Extract A addresses from a response.
pub fn extract_a_ips(msg: &Message) -> Vec<Ipv4Addr> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::A(a) => Some(Ipv4Addr::from(*a)),
            _ => None,
        })
        .collect()
}

/// Assert response code.
pub fn assert_response_code(msg: &Message, expected: ResponseCode) {
    assert_eq!(
        msg.response_code(),
        expected,
        "expected {:?}, got {:?}",
        expected,
        msg.response_code()
    );
}
