// Claiming handshake tests: a scripted fake device on one side,
// wiremock standing in for the cloud claiming service on the other.

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rainfly_api::{ApiClient, DeviceError, DeviceTransport};
use rainfly_core::proto::MsgStatus;
use rainfly_core::proto::claim::{ClaimFrame, ClaimMsg, PayloadBuf};
use rainfly_core::{ClaimEngine, ClaimError, ClaimStep};

// ── Fake device ─────────────────────────────────────────────────────

/// Serves the claiming endpoint the way firmware does: device info on
/// start, the CSR in fixed-size chunks, certificate chunks absorbed.
struct FakeDevice {
    device_info: Vec<u8>,
    csr: Vec<u8>,
    chunk: usize,
    csr_cursor: usize,
    cert: Vec<u8>,
    /// (offset, total_len, payload_len) per certificate request.
    cert_requests: Vec<(u32, u32, usize)>,
    abort_received: bool,
    fail_csr_with: Option<MsgStatus>,
    endpoint_missing: bool,
}

impl FakeDevice {
    fn new(csr: Vec<u8>, chunk: usize) -> Self {
        Self {
            device_info: serde_json::to_vec(&json!({ "mac": "AA:BB:CC", "platform": "esp32" }))
                .expect("device info json"),
            csr,
            chunk,
            csr_cursor: 0,
            cert: Vec::new(),
            cert_requests: Vec::new(),
            abort_received: false,
            fail_csr_with: None,
            endpoint_missing: false,
        }
    }
}

impl DeviceTransport for FakeDevice {
    async fn exchange(&mut self, _endpoint: &str, payload: Vec<u8>) -> Result<Vec<u8>, DeviceError> {
        if self.endpoint_missing {
            return Err(DeviceError::EndpointMissing);
        }
        let frame: ClaimFrame = serde_json::from_slice(&payload).expect("request frame");

        let resp = match frame.msg {
            ClaimMsg::ClaimStart => ClaimFrame {
                msg: ClaimMsg::ClaimStart,
                status: MsgStatus::Success,
                buf: PayloadBuf {
                    offset: 0,
                    total_len: self.device_info.len() as u32,
                    payload: self.device_info.clone(),
                },
            },
            ClaimMsg::ClaimInit => {
                if let Some(status) = self.fail_csr_with {
                    ClaimFrame {
                        msg: ClaimMsg::ClaimInit,
                        status,
                        buf: PayloadBuf::default(),
                    }
                } else {
                    let offset = self.csr_cursor;
                    let end = usize::min(offset + self.chunk, self.csr.len());
                    self.csr_cursor = end;
                    ClaimFrame {
                        msg: ClaimMsg::ClaimInit,
                        status: MsgStatus::Success,
                        buf: PayloadBuf {
                            offset: offset as u32,
                            total_len: self.csr.len() as u32,
                            payload: self.csr[offset..end].to_vec(),
                        },
                    }
                }
            }
            ClaimMsg::ClaimVerify => {
                self.cert_requests.push((
                    frame.buf.offset,
                    frame.buf.total_len,
                    frame.buf.payload.len(),
                ));
                self.cert.extend_from_slice(&frame.buf.payload);
                ClaimFrame {
                    msg: ClaimMsg::ClaimVerify,
                    status: MsgStatus::Success,
                    buf: PayloadBuf::default(),
                }
            }
            ClaimMsg::ClaimAbort => {
                self.abort_received = true;
                ClaimFrame {
                    msg: ClaimMsg::ClaimAbort,
                    status: MsgStatus::Success,
                    buf: PayloadBuf::default(),
                }
            }
        };

        Ok(serde_json::to_vec(&resp).expect("response frame"))
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn csr_json() -> Value {
    json!({ "csr": "-----BEGIN CERTIFICATE REQUEST-----\nMIIB...\n-----END-----" })
}

fn csr_bytes() -> Vec<u8> {
    serde_json::to_vec(&csr_json()).expect("csr json")
}

async fn cloud(certificate: &[u8]) -> (MockServer, ApiClient) {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/claim/initiate"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "auth_token": "tok" })),
        )
        .mount(&server)
        .await;

    // Matching on the exact CSR body doubles as the reassembly check:
    // a mis-assembled CSR never reaches this mock.
    Mock::given(method("POST"))
        .and(path("/claim/verify"))
        .and(body_json(csr_json()))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(certificate.to_vec(), "application/json"),
        )
        .mount(&server)
        .await;

    let base: url::Url = server.uri().parse().expect("server uri");
    let client = ApiClient::with_client(reqwest::Client::new(), base.clone(), base);
    (server, client)
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn full_handshake_chunk_accounting() {
    let certificate =
        serde_json::to_vec(&json!({ "certificate": "-----BEGIN CERTIFICATE-----\nAAAA\n" }))
            .expect("certificate json");
    let chunk = 10usize;
    let (_server, api) = cloud(&certificate).await;

    let mut device = FakeDevice::new(csr_bytes(), chunk);
    let cancel = CancellationToken::new();
    ClaimEngine::new(&mut device, &api)
        .run(&cancel)
        .await
        .expect("handshake completes");

    // The device holds the full certificate, byte for byte.
    assert_eq!(device.cert, certificate);

    // ceil(L / C) certificate requests, offsets stepping by C.
    let total = certificate.len();
    let expected_requests = total.div_ceil(chunk);
    assert_eq!(device.cert_requests.len(), expected_requests);
    for (i, (offset, total_len, _)) in device.cert_requests.iter().enumerate() {
        assert_eq!(*offset as usize, i * chunk);
        assert_eq!(*total_len as usize, total);
    }

    // Final chunk is L mod C (or C when L divides evenly).
    let expected_last = match total % chunk {
        0 => chunk,
        rem => rem,
    };
    let (_, _, last_len) = device.cert_requests.last().expect("at least one request");
    assert_eq!(*last_len, expected_last);

    assert!(!device.abort_received);
}

#[tokio::test]
async fn single_chunk_csr_sends_certificate_whole() {
    let certificate = serde_json::to_vec(&json!({ "certificate": "short" })).expect("cert json");
    let csr = csr_bytes();
    let chunk = csr.len(); // whole CSR in one response
    let (_server, api) = cloud(&certificate).await;

    let mut device = FakeDevice::new(csr, chunk);
    let cancel = CancellationToken::new();
    ClaimEngine::new(&mut device, &api)
        .run(&cancel)
        .await
        .expect("handshake completes");

    assert_eq!(device.cert, certificate);
    assert_eq!(device.cert_requests.len(), certificate.len().div_ceil(chunk));
}

#[tokio::test]
async fn cloud_initiate_failure_aborts_device_with_description() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/claim/initiate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "failure",
            "description": "device already claimed"
        })))
        .mount(&server)
        .await;
    let base: url::Url = server.uri().parse().expect("server uri");
    let api = ApiClient::with_client(reqwest::Client::new(), base.clone(), base);

    let mut device = FakeDevice::new(csr_bytes(), 8);
    let cancel = CancellationToken::new();
    let err = ClaimEngine::new(&mut device, &api)
        .run(&cancel)
        .await
        .expect_err("must abort");

    // Abort went to the device, but the surfaced error is the
    // triggering cloud failure.
    assert!(device.abort_received);
    match err {
        ClaimError::Cloud { step, message } => {
            assert_eq!(step, ClaimStep::Init);
            assert_eq!(message, "device already claimed");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn device_status_failure_echoes_status_without_abort() {
    let certificate = serde_json::to_vec(&json!({ "certificate": "x" })).expect("cert json");
    let (_server, api) = cloud(&certificate).await;

    let mut device = FakeDevice::new(csr_bytes(), 8);
    device.fail_csr_with = Some(MsgStatus::InvalidState);
    let cancel = CancellationToken::new();
    let err = ClaimEngine::new(&mut device, &api)
        .run(&cancel)
        .await
        .expect_err("must fail");

    match err {
        ClaimError::DeviceStatus { step, status } => {
            assert_eq!(step, ClaimStep::CsrFetch);
            assert_eq!(status, MsgStatus::InvalidState);
        }
        other => panic!("unexpected error: {other}"),
    }
    // Device-side protocol failures report upward; only cloud
    // rejections trigger the abort command.
    assert!(!device.abort_received);
}

#[tokio::test]
async fn missing_endpoint_is_classified() {
    let certificate = serde_json::to_vec(&json!({ "certificate": "x" })).expect("cert json");
    let (_server, api) = cloud(&certificate).await;

    let mut device = FakeDevice::new(csr_bytes(), 8);
    device.endpoint_missing = true;
    let cancel = CancellationToken::new();
    let err = ClaimEngine::new(&mut device, &api)
        .run(&cancel)
        .await
        .expect_err("must fail");

    assert!(matches!(err, ClaimError::EndpointMissing));
}

#[tokio::test]
async fn cancellation_stops_before_the_next_step() {
    let certificate = serde_json::to_vec(&json!({ "certificate": "x" })).expect("cert json");
    let (_server, api) = cloud(&certificate).await;

    let mut device = FakeDevice::new(csr_bytes(), 8);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = ClaimEngine::new(&mut device, &api)
        .run(&cancel)
        .await
        .expect_err("must cancel");

    assert!(matches!(err, ClaimError::Cancelled));
    assert!(device.cert_requests.is_empty());
}
