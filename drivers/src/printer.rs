/*++

Licensed under the Apache-2.0 license.

File Name:

    printer.rs

Abstract:

    File contains support routines and macros to print boot progress

--*/
use core::convert::Infallible;
use ufmt::{uDisplay, uWrite};

#[derive(Default)]
pub struct Printer;

impl uWrite for Printer {
    type Error = Infallible;

    /// Writes a string slice into this writer, returning whether the write succeeded.
    #[cfg(not(feature = "std"))]
    #[inline(never)]
    fn write_str(&mut self, _str: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Writes a string slice into this writer, returning whether the write succeeded.
    #[cfg(feature = "std")]
    fn write_str(&mut self, str: &str) -> Result<(), Self::Error> {
        print!("{str}");
        Ok(())
    }
}

#[macro_export]
macro_rules! cprintln {
    ($($tt:tt)*) => {{
        let _ = ufmt::uwriteln!(&mut $crate::printer::Printer::default(), $($tt)*);
    }}
}

pub struct HexBytes<'a>(pub &'a [u8]);
impl uDisplay for HexBytes<'_> {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        for &x in self.0.iter() {
            for c in [x >> 4, x & 0xf] {
                if c < 10 {
                    f.write_char((c + b'0') as char)?;
                } else {
                    f.write_char((c - 10 + b'A') as char)?;
                }
            }
        }
        Ok(())
    }
}

/// Prints a `BootError` as its hex code
pub struct ErrCode(pub bdb_error::BootError);
impl uDisplay for ErrCode {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        ufmt::uwrite!(f, "0x")?;
        HexBytes(&u32::from(self.0).to_be_bytes()).fmt(f)
    }
}
