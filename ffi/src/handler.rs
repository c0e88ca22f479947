#![allow(dead_code)]
use core::fmt::{
  self,
  Write,
};

use libc::FILE;

#[cfg(target_os = "linux")]
unsafe extern "C" {
  static mut stderr: *mut FILE;
}

#[cfg(target_os = "macos")]
unsafe extern "C" {
  #[link_name = "__stderrp"]
  static mut stderr: *mut FILE;
}

/// Fixed buffer the panic message is formatted into; longer text is cut.
struct MessageBuf {
  buf: [u8; 256],
  len: usize,
}

impl Write for MessageBuf {
  fn write_str(&mut self, s: &str) -> fmt::Result {
    let room = self.buf.len() - self.len;
    let n = s.len().min(room);
    self.buf[self.len..self.len + n].copy_from_slice(&s.as_bytes()[..n]);
    self.len += n;
    Ok(())
  }
}

#[cfg(all(not(test), any(target_os = "linux", target_os = "macos")))]
#[panic_handler]
pub fn panic_handler(info: &core::panic::PanicInfo) -> ! {
  let mut msg = MessageBuf {
    buf: [0; 256],
    len: 0,
  };
  let _ = write!(msg, "{}", info.message());

  unsafe {
    libc::fprintf(
      stderr,
      b"sys_heap panic: %.*s\n\0".as_ptr() as *const libc::c_char,
      msg.len as libc::c_int,
      msg.buf.as_ptr() as *const libc::c_char,
    );

    if let Some(loc) = info.location() {
      libc::fprintf(
        stderr,
        b"at %.*s:%d:%d\n\0".as_ptr() as *const libc::c_char,
        loc.file().len() as libc::c_int,
        loc.file().as_ptr() as *const libc::c_char,
        loc.line() as libc::c_int,
        loc.column() as libc::c_int,
      );
    }

    libc::abort();
  }
}
