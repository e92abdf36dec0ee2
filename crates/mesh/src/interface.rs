//! Shelled-out wireless interface control.

use std::process::Command;

use tracing::debug;

use crate::error::{MeshError, Result};

fn exec(program: &str, args: &[&str]) -> Result<String> {
    debug!("# {} {}", program, args.join(" "));
    let output = Command::new(program).args(args).output()?;
    if !output.status.success() {
        return Err(MeshError::Command(format!(
            "{} {}: {}",
            program,
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Brings the interface up.
pub fn activate(iface: &str) -> Result<()> {
    exec("ip", &["link", "set", iface, "up"]).map(|_| ())
}

/// Tunes the interface to a channel.
pub fn set_channel(iface: &str, channel: u32) -> Result<()> {
    exec("iw", &["dev", iface, "set", "channel", &channel.to_string()]).map(|_| ())
}

/// Queries the channels the interface supports.
pub fn supported_channels(iface: &str) -> Result<Vec<u32>> {
    let output = exec("iwlist", &[iface, "freq"])?;
    Ok(parse_channels(&output))
}

fn parse_channels(output: &str) -> Vec<u32> {
    let mut channels = Vec::new();
    for line in output.lines() {
        let mut tokens = line.split_whitespace();
        while let Some(token) = tokens.next() {
            if token == "Channel" {
                if let Some(channel) = tokens.next().and_then(|n| n.parse().ok()) {
                    channels.push(channel);
                }
            }
        }
    }
    channels.sort_unstable();
    channels.dedup();
    channels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channels_from_iwlist_output() {
        let output = "wlan0mon  14 channels in total; available frequencies :\n\
                      \x20         Channel 01 : 2.412 GHz\n\
                      \x20         Channel 02 : 2.417 GHz\n\
                      \x20         Channel 11 : 2.462 GHz\n\
                      \x20         Current Frequency:2.412 GHz (Channel 1)\n";
        assert_eq!(parse_channels(output), vec![1, 2, 11]);
    }

    #[test]
    fn test_parse_channels_empty_output() {
        assert!(parse_channels("").is_empty());
        assert!(parse_channels("no frequency information.\n").is_empty());
    }
}
