//! Hickory request handler that answers from a [`RecordSynthesizer`].
//!
//! Every request gets exactly one response:
//!
//! | Outcome                  | Response code |
//! |--------------------------|---------------|
//! | source outside allowlist | REFUSED       |
//! | records synthesized      | NOERROR (AA)  |
//! | name ours, no records    | NOERROR (AA)  |
//! | not a synthetic name     | REFUSED       |
//! | inventory failure        | SERVFAIL      |

use async_trait::async_trait;
use hickory_proto::op::{Edns, Header, ResponseCode};
use hickory_proto::rr::{Name, Record};
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace};

use crate::access::AccessPolicy;
use crate::metrics::{self, QueryResult, Timer};
use crate::synthesizer::{Outcome, RecordSynthesizer};

/// Request handler shared by the UDP and TCP listeners.
#[derive(Clone)]
pub struct SynthHandler {
    synthesizer: Arc<RecordSynthesizer>,
    access: Option<Arc<AccessPolicy>>,
}

impl SynthHandler {
    /// Create a handler. With an [`AccessPolicy`], sources outside it are refused.
    pub fn new(synthesizer: Arc<RecordSynthesizer>, access: Option<Arc<AccessPolicy>>) -> Self {
        Self {
            synthesizer,
            access,
        }
    }

    /// The synthesizer answering queries.
    pub fn synthesizer(&self) -> &Arc<RecordSynthesizer> {
        &self.synthesizer
    }
}

#[async_trait]
impl RequestHandler for SynthHandler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> ResponseInfo {
        let request_info = match request.request_info() {
            Ok(info) => info,
            Err(e) => {
                debug!(error = %e, "malformed request");
                return send_response(request, &mut response_handle, ResponseCode::FormErr, &[])
                    .await;
            }
        };

        let query = request_info.query;
        let rtype = query.query_type();
        let rtype_str = format!("{:?}", rtype);

        if let Some(ref access) = self.access {
            let src = request.src().ip();
            if !access.allows(src) {
                debug!(%src, name = %query.name(), "source not in allowlist");
                metrics::record_query(&rtype_str, QueryResult::Refused, Duration::ZERO);
                return send_response(request, &mut response_handle, ResponseCode::Refused, &[])
                    .await;
            }
        }

        let timer = Timer::start();
        let name = Name::from(query.name().clone());
        trace!(%name, ?rtype, "DNS lookup");

        match self
            .synthesizer
            .synthesize(&name, rtype, query.query_class())
            .await
        {
            Outcome::Handled(records) => {
                if records.is_empty() {
                    debug!(%name, ?rtype, "no records of requested type");
                    metrics::record_query(&rtype_str, QueryResult::NoData, timer.elapsed());
                } else {
                    metrics::record_records_returned(&rtype_str, records.len());
                    metrics::record_query(&rtype_str, QueryResult::Success, timer.elapsed());
                }
                send_response(request, &mut response_handle, ResponseCode::NoError, &records).await
            }
            Outcome::NotApplicable => {
                debug!(%name, ?rtype, "not a synthetic name");
                metrics::record_query(&rtype_str, QueryResult::NotApplicable, timer.elapsed());
                send_response(request, &mut response_handle, ResponseCode::Refused, &[]).await
            }
            Outcome::Failed(e) => {
                debug!(%name, error = %e, "returning SERVFAIL");
                metrics::record_query(&rtype_str, QueryResult::Error, timer.elapsed());
                send_response(request, &mut response_handle, ResponseCode::ServFail, &[]).await
            }
        }
    }
}

/// Send `answers` with `code`. NOERROR answers carry the AA bit.
async fn send_response<R: ResponseHandler>(
    request: &Request,
    response_handle: &mut R,
    code: ResponseCode,
    answers: &[Record],
) -> ResponseInfo {
    let mut builder = MessageResponseBuilder::from_message_request(request);
    if let Some(req_edns) = request.edns() {
        let mut edns = Edns::new();
        edns.set_max_payload(req_edns.max_payload().max(512));
        edns.set_version(0);
        builder.edns(edns);
    }

    let mut header = Header::response_from_request(request.header());
    header.set_response_code(code);
    header.set_authoritative(code == ResponseCode::NoError);

    let response = builder.build(header, answers.iter(), &[], &[], &[]);
    match response_handle.send_response(response).await {
        Ok(info) => info,
        Err(e) => {
            error!(error = %e, code = ?code, "failed to send response");
            let mut header = Header::response_from_request(request.header());
            header.set_response_code(ResponseCode::ServFail);
            ResponseInfo::from(header)
        }
    }
}
