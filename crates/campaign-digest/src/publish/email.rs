//! SMTP delivery

use std::fmt;

use lettre::address::Address;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use crate::config::{Channel, EmailConfig, Thresholds};
use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::presenters::email::{self as presenter, EmailDocument};

use super::Publisher;

pub const STARTTLS_PORT: u16 = 587;
pub const IMPLICIT_TLS_PORT: u16 = 465;

/// How the SMTP session is encrypted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Plain connection upgraded with STARTTLS
    StartTls,
    /// TLS from the first byte
    ImplicitTls,
}

/// One way of reaching the SMTP server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmtpAttempt {
    pub security: SmtpSecurity,
    pub port: u16,
}

impl fmt::Display for SmtpAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.security {
            SmtpSecurity::StartTls => write!(f, "STARTTLS on port {}", self.port),
            SmtpSecurity::ImplicitTls => write!(f, "implicit TLS on port {}", self.port),
        }
    }
}

/// Primary and fallback connection for the configured port
pub fn connection_plan(port: u16) -> [SmtpAttempt; 2] {
    let implicit = SmtpAttempt {
        security: SmtpSecurity::ImplicitTls,
        port: IMPLICIT_TLS_PORT,
    };
    if port == IMPLICIT_TLS_PORT {
        [
            implicit,
            SmtpAttempt {
                security: SmtpSecurity::StartTls,
                port: STARTTLS_PORT,
            },
        ]
    } else {
        [
            SmtpAttempt {
                security: SmtpSecurity::StartTls,
                port,
            },
            implicit,
        ]
    }
}

/// Permanent rejections (bad credentials, refused recipients) are final
fn should_fall_back(err: &smtp::Error) -> bool {
    !err.is_permanent()
}

/// Sends the digest email over SMTP
pub struct EmailPublisher {
    config: EmailConfig,
    from: Mailbox,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
}

impl EmailPublisher {
    /// Validate addresses up front so a bad setting fails before any I/O
    pub fn new(config: EmailConfig) -> Result<Self> {
        let from_address: Address = config.from_address.parse().map_err(|e| {
            Error::config(format!("EMAIL_FROM '{}' is invalid: {e}", config.from_address))
        })?;
        let from = Mailbox::new(Some(config.from_name.clone()), from_address);

        let parse_all = |key: &str, addresses: &[String]| -> Result<Vec<Mailbox>> {
            addresses
                .iter()
                .map(|a| {
                    a.parse::<Mailbox>()
                        .map_err(|e| Error::config(format!("{key} entry '{a}' is invalid: {e}")))
                })
                .collect()
        };
        let to = parse_all("EMAIL_TO", &config.to)?;
        let cc = parse_all("EMAIL_CC", &config.cc)?;

        Ok(Self {
            config,
            from,
            to,
            cc,
        })
    }

    /// Build the multipart message for `document`
    pub fn build_message(&self, document: &EmailDocument) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(document.subject.as_str());
        for mailbox in &self.to {
            builder = builder.to(mailbox.clone());
        }
        for mailbox in &self.cc {
            builder = builder.cc(mailbox.clone());
        }

        builder
            .multipart(MultiPart::alternative_plain_html(
                document.text.clone(),
                document.html.clone(),
            ))
            .map_err(|e| Error::email(format!("failed to build message: {e}")))
    }

    fn transport(
        &self,
        attempt: SmtpAttempt,
    ) -> std::result::Result<AsyncSmtpTransport<Tokio1Executor>, smtp::Error> {
        let builder = match attempt.security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)?
            }
            SmtpSecurity::ImplicitTls => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)?
            }
        };

        Ok(builder
            .port(attempt.port)
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .timeout(Some(self.config.timeout))
            .build())
    }

    async fn send_via(
        &self,
        attempt: SmtpAttempt,
        message: Message,
    ) -> std::result::Result<(), smtp::Error> {
        let transport = self.transport(attempt)?;
        transport.send(message).await?;
        Ok(())
    }

    /// Send `document`, falling back to the alternate encryption mode once
    pub async fn send(&self, document: &EmailDocument) -> Result<()> {
        let message = self.build_message(document)?;
        self.send_with_plan(connection_plan(self.config.port), message).await
    }

    async fn send_with_plan(
        &self,
        [primary, fallback]: [SmtpAttempt; 2],
        message: Message,
    ) -> Result<()> {
        let recipients = self.to.len() + self.cc.len();

        match self.send_via(primary, message.clone()).await {
            Ok(()) => {
                info!(host = %self.config.host, via = %primary, recipients, "Email sent");
                Ok(())
            }
            Err(e) if should_fall_back(&e) => {
                warn!(
                    host = %self.config.host,
                    via = %primary,
                    error = %e,
                    "SMTP attempt failed, trying {fallback}"
                );
                self.send_via(fallback, message).await.map_err(|e2| {
                    Error::email(format!("{primary} failed ({e}); {fallback} failed ({e2})"))
                })?;
                info!(host = %self.config.host, via = %fallback, recipients, "Email sent");
                Ok(())
            }
            Err(e) => Err(Error::email(format!("{primary}: {e}"))),
        }
    }
}

#[async_trait::async_trait]
impl Publisher for EmailPublisher {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn publish(&self, digest: &Digest, thresholds: &Thresholds) -> Result<()> {
        let document = presenter::render(digest, thresholds);
        self.send(&document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    async fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    /// Accepts one connection and hangs up without a greeting
    async fn hang_up_server() -> (u16, JoinHandle<bool>) {
        let (listener, port) = listener().await;
        let handle = tokio::spawn(async move { listener.accept().await.is_ok() });
        (port, handle)
    }

    /// Greets, then answers every command with a permanent auth failure
    async fn rejecting_server() -> u16 {
        let (listener, port) = listener().await;
        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();
            if write.write_all(b"220 mail.test ESMTP\r\n").await.is_err() {
                return;
            }
            while let Ok(Some(_)) = lines.next_line().await {
                let reply = b"535 5.7.8 Authentication credentials invalid\r\n";
                if write.write_all(reply).await.is_err() {
                    return;
                }
            }
        });
        port
    }

    fn local_publisher() -> EmailPublisher {
        let mut config = config();
        config.host = "127.0.0.1".to_string();
        config.timeout = Duration::from_secs(5);
        EmailPublisher::new(config).unwrap()
    }

    fn attempt(security: SmtpSecurity, port: u16) -> SmtpAttempt {
        SmtpAttempt { security, port }
    }

    fn config() -> EmailConfig {
        EmailConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: "secret".to_string(),
            from_address: "alerts@example.com".to_string(),
            from_name: "Campaign Updates".to_string(),
            to: vec!["ops@example.com".to_string(), "sales@example.com".to_string()],
            cc: vec!["boss@example.com".to_string()],
            timeout: Duration::from_secs(30),
        }
    }

    fn document() -> EmailDocument {
        EmailDocument {
            subject: "⚠️ Daily Campaign Alerts: 2024-03-14".to_string(),
            html: "<p>No data for 2024-03-14.</p>".to_string(),
            text: "No data for 2024-03-14.".to_string(),
        }
    }

    #[test]
    fn test_connection_plan() {
        assert_eq!(
            connection_plan(587),
            [
                SmtpAttempt {
                    security: SmtpSecurity::StartTls,
                    port: 587
                },
                SmtpAttempt {
                    security: SmtpSecurity::ImplicitTls,
                    port: 465
                },
            ]
        );
        assert_eq!(
            connection_plan(2525)[0],
            SmtpAttempt {
                security: SmtpSecurity::StartTls,
                port: 2525
            }
        );
        assert_eq!(
            connection_plan(465),
            [
                SmtpAttempt {
                    security: SmtpSecurity::ImplicitTls,
                    port: 465
                },
                SmtpAttempt {
                    security: SmtpSecurity::StartTls,
                    port: 587
                },
            ]
        );
        assert_eq!(connection_plan(587)[1].to_string(), "implicit TLS on port 465");
    }

    #[tokio::test]
    async fn test_connection_failure_tries_the_fallback() {
        let (primary_port, primary) = hang_up_server().await;
        let (fallback_port, fallback) = hang_up_server().await;
        let publisher = local_publisher();
        let message = publisher.build_message(&document()).unwrap();

        let err = publisher
            .send_with_plan(
                [
                    attempt(SmtpSecurity::StartTls, primary_port),
                    attempt(SmtpSecurity::ImplicitTls, fallback_port),
                ],
                message,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Email(_)));
        let message = err.to_string();
        assert!(message.contains(&format!("STARTTLS on port {primary_port} failed")));
        assert!(message.contains(&format!("implicit TLS on port {fallback_port} failed")));

        let wait = Duration::from_secs(5);
        assert!(tokio::time::timeout(wait, primary).await.unwrap().unwrap());
        assert!(tokio::time::timeout(wait, fallback).await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn test_permanent_rejection_is_not_retried() {
        let primary_port = rejecting_server().await;
        let (fallback, fallback_port) = listener().await;
        let publisher = local_publisher();
        let message = publisher.build_message(&document()).unwrap();

        let err = publisher
            .send_with_plan(
                [
                    attempt(SmtpSecurity::StartTls, primary_port),
                    attempt(SmtpSecurity::ImplicitTls, fallback_port),
                ],
                message,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Email(_)));
        let message = err.to_string();
        assert!(message.contains(&format!("STARTTLS on port {primary_port}")));
        assert!(!message.contains(&format!("port {fallback_port}")));

        let contacted = tokio::time::timeout(Duration::from_millis(200), fallback.accept()).await;
        assert!(contacted.is_err(), "fallback server was contacted");
    }

    #[test]
    fn test_message_envelope_includes_cc() {
        let publisher = EmailPublisher::new(config()).unwrap();
        let message = publisher.build_message(&document()).unwrap();

        let envelope: Vec<String> = message
            .envelope()
            .to()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            envelope,
            vec!["ops@example.com", "sales@example.com", "boss@example.com"]
        );
        assert_eq!(
            message.envelope().from().map(ToString::to_string),
            Some("alerts@example.com".to_string())
        );

        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("multipart/alternative"));
        assert!(formatted.contains("Campaign Updates"));
    }

    #[test]
    fn test_invalid_addresses_are_config_errors() {
        let mut bad_from = config();
        bad_from.from_address = "not an address".to_string();
        assert!(matches!(EmailPublisher::new(bad_from), Err(Error::Config(_))));

        let mut bad_cc = config();
        bad_cc.cc = vec!["boss@@example".to_string()];
        let err = EmailPublisher::new(bad_cc).err().unwrap();
        assert!(err.to_string().contains("EMAIL_CC"));
    }
}
