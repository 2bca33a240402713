use anyhow::{Result, anyhow};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;

use crate::level::Channel;
use crate::reassembler::LogReassembler;

/// size of the read buffer used for each channel
pub const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Drives `reassembler` from two byte streams until both reach end of stream.
///
/// Each channel is finished as soon as it closes, so a still-running err
/// stream never has its partial line cut short by the out stream ending.
/// This differs from calling [`LogReassembler::flush`], which ends both
/// channels at once, when the first stream closes.
/// On a read error both channels are flushed before the error is returned.
pub async fn attach<O, E>(reassembler: &mut LogReassembler, mut out: O, mut err: E) -> Result<()>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    log::debug!(
        "LogReassembler: Attached to streams for {}",
        reassembler.app_name()
    );

    let mut out_buf = vec![0u8; READ_CHUNK_SIZE];
    let mut err_buf = vec![0u8; READ_CHUNK_SIZE];
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        let (channel, read) = tokio::select! {
            read = out.read(&mut out_buf), if out_open => (Channel::Out, read),
            read = err.read(&mut err_buf), if err_open => (Channel::Err, read),
        };

        match read {
            Ok(0) => {
                log::debug!("LogReassembler: {} stream ended", channel);
                match channel {
                    Channel::Out => out_open = false,
                    Channel::Err => err_open = false,
                }
                reassembler.finish(channel);
            }
            Ok(n) => {
                let buf = match channel {
                    Channel::Out => &out_buf[..n],
                    Channel::Err => &err_buf[..n],
                };
                reassembler.push(channel, buf);
            }
            Err(e) => {
                log::error!("LogReassembler: Error reading {} stream: {}", channel, e);
                reassembler.flush();
                return Err(e.into());
            }
        }
    }

    Ok(())
}

/// Attaches to the piped stdout/stderr of an already spawned child.
///
/// The child must have been spawned with both streams piped; they are taken
/// out of `child`, which is left for the caller to wait on.
pub async fn attach_child(reassembler: &mut LogReassembler, child: &mut Child) -> Result<()> {
    let out = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("child stdout is not piped"))?;
    let err = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("child stderr is not piped"))?;

    attach(reassembler, out, err).await
}
