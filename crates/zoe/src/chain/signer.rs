use std::process::Output;

use serde::Deserialize;
use tokio::process::Command;

use super::rpc::TransactionResponse;
use super::{ChainError, Ptb};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeytoolSignature {
    sui_signature: String,
}

/// Signs transactions with the local Sui CLI keystore.
///
/// The keystore holds the private key of the wallet address; the key never
/// enters this process.
pub struct Signer {
    binary: String,
    address: String,
    gas_budget: u64,
}

impl Signer {
    /// Creates a signer for the given address.
    pub fn new(binary: &str, address: &str, gas_budget: u64) -> Self {
        Self {
            binary: binary.to_owned(),
            address: address.to_owned(),
            gas_budget,
        }
    }

    /// Returns the signing address.
    #[inline]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the full argument list used to run a transaction.
    pub fn ptb_args(&self, ptb: &Ptb) -> Vec<String> {
        let mut args = vec!["client".to_owned(), "ptb".to_owned()];
        args.extend(ptb.args().iter().cloned());
        args.extend([
            "--sender".to_owned(),
            format!("@{}", self.address),
            "--gas-budget".to_owned(),
            self.gas_budget.to_string(),
            "--json".to_owned(),
        ]);
        args
    }

    /// Builds, signs and executes a programmable transaction.
    pub async fn execute(
        &self,
        ptb: &Ptb,
    ) -> Result<TransactionResponse, ChainError> {
        let stdout = self.run(&self.ptb_args(ptb)).await?;
        let resp: TransactionResponse = serde_json::from_slice(&stdout)
            .map_err(|err| ChainError::Decode(format!("sui client ptb: {err}")))?;
        info!("executed transaction {}", resp.digest);
        resp.into_success()
    }

    /// Signs base64 transaction bytes and returns the serialized signature.
    pub async fn sign(&self, tx_bytes: &str) -> Result<String, ChainError> {
        let args = [
            "keytool",
            "sign",
            "--address",
            self.address.as_str(),
            "--data",
            tx_bytes,
            "--json",
        ];
        let stdout = self.run(&args).await?;
        let signature: KeytoolSignature = serde_json::from_slice(&stdout)
            .map_err(|err| ChainError::Decode(format!("sui keytool sign: {err}")))?;
        Ok(signature.sui_signature)
    }

    async fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<Vec<u8>, ChainError> {
        let args: Vec<&str> = args.iter().map(|arg| arg.as_ref()).collect();
        debug!("running {} {}", self.binary, args.join(" "));
        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .await
            .map_err(|source| ChainError::Spawn {
                program: self.binary.clone(),
                source,
            })?;
        check_output(&self.binary, output)
    }
}

fn check_output(program: &str, output: Output) -> Result<Vec<u8>, ChainError> {
    if output.status.success() {
        return Ok(output.stdout);
    }
    let mut stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
    if stderr.is_empty() {
        stderr = format!("exited with {}", output.status);
    }
    warn!("`{program}` failed: {stderr}");
    Err(ChainError::Cli {
        program: program.to_owned(),
        stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ptb_args() {
        let signer = Signer::new("sui", "0xa11ce", 50_000_000);
        let ptb = Ptb::new()
            .split_coins("gas", &[7])
            .assign("coin")
            .transfer_objects(&["coin"], "0xb0b");
        let args = signer.ptb_args(&ptb);
        assert_eq!(&args[..2], ["client", "ptb"]);
        assert_eq!(
            &args[args.len() - 5..],
            ["--sender", "@0xa11ce", "--gas-budget", "50000000", "--json"]
        );
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let signer = Signer::new("/nonexistent/sui", "0xa11ce", 1);
        let err = signer.sign("AAAA").await.unwrap_err();
        assert!(matches!(err, ChainError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_failed_command() {
        // `false` ignores its arguments and exits with 1.
        let signer = Signer::new("false", "0xa11ce", 1);
        let err = signer.execute(&Ptb::new()).await.unwrap_err();
        assert!(matches!(err, ChainError::Cli { ref stderr, .. } if stderr.starts_with("exited with")));
    }
}
