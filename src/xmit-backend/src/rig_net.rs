// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Real transceiver backend speaking a `rigctld`-style network text-line CAT
//! protocol (§4.5): short ASCII commands, one line of response, errors
//! reported as `RPRT <n>`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use xmit_core::error::{RigError, RigResult};
use xmit_core::rig::TransceiverAdapter;

/// Per-call I/O timeout (§5 "the adapter's own timeout, default 2 s").
const CALL_TIMEOUT: Duration = Duration::from_secs(2);
/// Below this, a reported frequency is treated as a nonsense response (§4.5).
const MIN_SANE_FREQUENCY_HZ: u64 = 100_000;

pub struct NetRig {
    address: String,
    conn: Option<BufReader<TcpStream>>,
}

impl NetRig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            conn: None,
        }
    }

    async fn call(&mut self, command: &str) -> RigResult<String> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| RigError::link("not connected"))?;

        timeout(CALL_TIMEOUT, async {
            conn.write_all(command.as_bytes()).await?;
            conn.write_all(b"\n").await?;
            conn.flush().await?;
            let mut line = String::new();
            conn.read_line(&mut line).await?;
            Ok::<String, std::io::Error>(line)
        })
        .await
        .map_err(|_| RigError::transient("timeout waiting for rig response"))?
        .map_err(|e| RigError::link(e.to_string()))
        .map(|line| line.trim().to_string())
    }

    /// Send a command expecting an `RPRT <n>` acknowledgement.
    async fn call_expect_ok(&mut self, command: &str) -> RigResult<()> {
        let line = self.call(command).await?;
        parse_rprt(&line)
    }
}

fn parse_rprt(line: &str) -> RigResult<()> {
    let Some(code) = line.strip_prefix("RPRT ") else {
        return Err(RigError::link(format!("unexpected response: '{line}'")));
    };
    match code.trim().parse::<i32>() {
        Ok(0) => Ok(()),
        Ok(n) => Err(RigError::permanent(format!("rig reported error {n}"))),
        Err(_) => Err(RigError::link(format!("malformed RPRT line: '{line}'"))),
    }
}

impl TransceiverAdapter for NetRig {
    fn open<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let stream = timeout(CALL_TIMEOUT, TcpStream::connect(&self.address))
                .await
                .map_err(|_| RigError::transient("timeout connecting to rig"))?
                .map_err(|e| RigError::link(e.to_string()))?;
            self.conn = Some(BufReader::new(stream));

            let line = self.call("F").await?;
            let hz: u64 = line
                .parse()
                .map_err(|_| RigError::link(format!("nonsense frequency response: '{line}'")))?;
            if hz < MIN_SANE_FREQUENCY_HZ {
                self.conn = None;
                return Err(RigError::link(format!(
                    "nonsense frequency response: {hz} Hz"
                )));
            }
            Ok(())
        })
    }

    fn close<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>> {
        self.conn = None;
        Box::pin(async { Ok(()) })
    }

    fn set_frequency<'a>(
        &'a mut self,
        hz: u64,
    ) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>> {
        Box::pin(async move { self.call_expect_ok(&format!("F {hz}")).await })
    }

    fn set_mode<'a>(
        &'a mut self,
        mode: &'a str,
    ) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>> {
        Box::pin(async move { self.call_expect_ok(&format!("m {mode} 0")).await })
    }

    fn set_power<'a>(
        &'a mut self,
        fraction: f32,
    ) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>> {
        Box::pin(async move {
            self.call_expect_ok(&format!("L RFPOWER {fraction:.3}")).await
        })
    }

    fn set_ptt<'a>(
        &'a mut self,
        on: bool,
    ) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>> {
        Box::pin(async move {
            self.call_expect_ok(&format!("T {}", if on { 1 } else { 0 })).await
        })
    }

    fn get_signal_strength<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = RigResult<i32>> + Send + 'a>> {
        Box::pin(async move {
            let line = self.call("l STRENGTH").await?;
            line.parse()
                .map_err(|_| RigError::link(format!("nonsense strength response: '{line}'")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rprt_zero_is_ok() {
        assert!(parse_rprt("RPRT 0").is_ok());
    }

    #[test]
    fn nonzero_rprt_is_permanent_error() {
        let err = parse_rprt("RPRT -11").unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn unrecognized_line_is_a_link_error() {
        assert!(parse_rprt("garbage").is_err());
    }
}
