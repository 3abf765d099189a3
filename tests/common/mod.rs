#![allow(dead_code)]

pub mod test_server {
    use std::net::SocketAddr;
    use std::sync::Once;
    use yahs::runtime_config::RuntimeConfig;
    use yahs::{Router, Server, ServerConfig, ServerHandle};

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }

    /// Loopback config on an ephemeral port.
    pub fn loopback_config() -> ServerConfig {
        ServerConfig {
            hostname: "127.0.0.1".to_string(),
            port: 0,
            ..ServerConfig::default()
        }
    }

    /// Running server that is stopped when dropped, even if the test panics.
    pub struct TestServer {
        handle: Option<ServerHandle>,
        addr: SocketAddr,
        https_addr: Option<SocketAddr>,
    }

    impl TestServer {
        pub fn start(router: Router) -> Self {
            Self::start_with(loopback_config(), router)
        }

        pub fn start_with(config: ServerConfig, router: Router) -> Self {
            setup_may_runtime();
            let handle = Server::new(config, router)
                .with_runtime(RuntimeConfig { stack_size: 0x8000 })
                .start()
                .unwrap();
            handle.wait_ready().unwrap();
            Self {
                addr: handle.http_addr(),
                https_addr: handle.https_addr(),
                handle: Some(handle),
            }
        }

        pub fn addr(&self) -> SocketAddr {
            self.addr
        }

        pub fn https_addr(&self) -> Option<SocketAddr> {
            self.https_addr
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            if let Some(handle) = self.handle.take() {
                handle.stop();
            }
        }
    }
}

pub mod http {
    use std::io::{Read, Write};
    use std::net::{Shutdown, SocketAddr, TcpStream};
    use std::time::Duration;

    /// A response as seen on the wire.
    #[derive(Debug)]
    pub struct RawResponse {
        pub status: u16,
        pub reason: String,
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
    }

    impl RawResponse {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }

        pub fn text(&self) -> String {
            String::from_utf8_lossy(&self.body).into_owned()
        }
    }

    fn connect(addr: SocketAddr) -> TcpStream {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream.set_nodelay(true).unwrap();
        stream
    }

    fn read_all(mut stream: TcpStream) -> Vec<u8> {
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        out
    }

    /// Send `raw` in one write, half-close, and collect everything the server
    /// sends back until it closes the connection.
    pub fn send_raw(addr: SocketAddr, raw: &[u8]) -> Vec<u8> {
        let mut stream = connect(addr);
        stream.write_all(raw).unwrap();
        stream.shutdown(Shutdown::Write).unwrap();
        read_all(stream)
    }

    /// Like [`send_raw`] but one byte per write.
    pub fn send_trickled(addr: SocketAddr, raw: &[u8]) -> Vec<u8> {
        let mut stream = connect(addr);
        for byte in raw {
            stream.write_all(std::slice::from_ref(byte)).unwrap();
            stream.flush().unwrap();
        }
        read_all(stream)
    }

    pub fn send_request(addr: SocketAddr, raw: &str) -> RawResponse {
        parse_response(&send_raw(addr, raw.as_bytes()))
    }

    /// Split a full HTTP/1.1 response into its parts.
    pub fn parse_response(raw: &[u8]) -> RawResponse {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response has a header block");
        let head = std::str::from_utf8(&raw[..split]).unwrap();
        let body = raw[split + 4..].to_vec();

        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap();
        let mut parts = status_line.splitn(3, ' ');
        assert_eq!(parts.next(), Some("HTTP/1.1"));
        let status = parts.next().unwrap().parse().unwrap();
        let reason = parts.next().unwrap_or_default().to_string();

        let headers = lines
            .filter_map(|line| line.split_once(": "))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        RawResponse {
            status,
            reason,
            headers,
            body,
        }
    }
}

pub mod tls {
    use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
    use rustls_pki_types::pem::PemObject;
    use rustls_pki_types::{CertificateDer, ServerName};
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    /// Self-signed `localhost` certificate and key written as PEM files.
    pub struct TestCertificate {
        _dir: tempfile::TempDir,
        pub cert_path: PathBuf,
        pub key_path: PathBuf,
    }

    impl TestCertificate {
        pub fn generate() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
            let cert_path = dir.path().join("certificate-chain.crt");
            let key_path = dir.path().join("server.key");
            std::fs::write(&cert_path, certified.cert.pem()).unwrap();
            std::fs::write(&key_path, certified.key_pair.serialize_pem()).unwrap();
            Self {
                _dir: dir,
                cert_path,
                key_path,
            }
        }
    }

    /// Client config trusting only the certificate at `cert_path`.
    pub fn client_config(cert_path: &Path) -> Arc<ClientConfig> {
        let mut roots = RootCertStore::empty();
        for cert in CertificateDer::pem_file_iter(cert_path).unwrap() {
            roots.add(cert.unwrap()).unwrap();
        }
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_root_certificates(roots)
            .with_no_client_auth();
        Arc::new(config)
    }

    /// Send `raw` over TLS and read until the server's close_notify.
    pub fn send_tls(addr: SocketAddr, config: &Arc<ClientConfig>, raw: &[u8]) -> Vec<u8> {
        let sock = TcpStream::connect(addr).unwrap();
        sock.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let session =
            ClientConnection::new(Arc::clone(config), ServerName::try_from("localhost").unwrap())
                .unwrap();
        let mut stream = StreamOwned::new(session, sock);
        stream.write_all(raw).unwrap();
        stream.flush().unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        out
    }
}
