use pnet::packet::ethernet::{EtherType, MutableEthernetPacket};
use pnet::util::MacAddr;
use sshsweep_common::error::ScanError;

pub fn make_header(
    buffer: &mut [u8],
    src_mac: MacAddr,
    dst_mac: MacAddr,
    et: EtherType,
) -> Result<(), ScanError> {
    let mut eth =
        MutableEthernetPacket::new(&mut buffer[..]).ok_or(ScanError::FrameBuild("ethernet"))?;

    eth.set_source(src_mac);
    eth.set_destination(dst_mac);
    eth.set_ethertype(et);

    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
