/*!
Scanning another process's memory, Linux only.

One bounded block is read with `process_vm_readv` and then scanned like
any other finite region, with offsets reported in terms of the remote
address space. Reading requires the same privileges as `ptrace`
attachment.
*/

use std::io;

use termcolor::WriteColor;

use crate::search::SearchWorker;

/// The origin label used for process memory scans.
const ORIGIN: &str = "memory";

/// Read `[offset, offset + size)` from the process `pid` and scan it.
///
/// A short read is not an error: scanning proceeds over the bytes that
/// were readable.
pub(crate) fn search_process<W: WriteColor>(
    worker: &mut SearchWorker<W>,
    pid: i32,
    offset: u64,
    size: u64,
) -> anyhow::Result<()> {
    let size = usize::try_from(size)?;
    let block = read_process_memory(pid, offset, size)?;
    log::debug!(
        "pid {}: read {} bytes at {:#x}",
        pid,
        block.len(),
        offset
    );
    worker.search_slice_at(ORIGIN, offset, &block)?;
    Ok(())
}

fn read_process_memory(
    pid: i32,
    offset: u64,
    size: usize,
) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; size];
    let local = libc::iovec {
        iov_base: buf.as_mut_ptr() as *mut libc::c_void,
        iov_len: buf.len(),
    };
    let remote = libc::iovec {
        iov_base: offset as *mut libc::c_void,
        iov_len: buf.len(),
    };
    // SAFETY: both iovecs point at live memory of the stated lengths and
    // the call does not retain them.
    let nread =
        unsafe { libc::process_vm_readv(pid, &local, 1, &remote, 1, 0) };
    if nread < 0 {
        return Err(io::Error::last_os_error());
    }
    buf.truncate(nread as usize);
    Ok(buf)
}
