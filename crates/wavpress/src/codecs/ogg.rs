use ogg_next_sys::*;
use std::ffi::{c_int, c_long};
use std::io::{self, Write};
use std::mem::MaybeUninit;
use std::slice;

/// A libogg logical stream that writes finished pages to `out`.
///
/// The stream state is cleared on drop.
pub struct OggWriter<W: Write> {
    stream: Box<ogg_stream_state>,
    out: W,
    packetno: i64,
}

impl<W: Write> OggWriter<W> {
    pub fn new(out: W, serialno: i32) -> Result<OggWriter<W>, String> {
        unsafe {
            let mut stream: Box<ogg_stream_state> = Box::new(MaybeUninit::zeroed().assume_init());
            if ogg_stream_init(stream.as_mut(), serialno as c_int) != 0 {
                return Err(String::from("ogg_stream_init failed"));
            }
            Ok(OggWriter {
                stream,
                out,
                packetno: 0,
            })
        }
    }

    /// Submits a packet produced by a native encoder.
    pub fn packet_in(&mut self, packet: &mut ogg_packet) -> Result<(), String> {
        let ret = unsafe { ogg_stream_packetin(self.stream.as_mut(), packet) };
        if ret != 0 {
            return Err(String::from("ogg_stream_packetin failed"));
        }
        self.packetno = packet.packetno + 1;
        Ok(())
    }

    /// Submits a packet built in Rust. libogg copies the bytes.
    pub fn write_packet(
        &mut self,
        data: &[u8],
        granulepos: i64,
        bos: bool,
        eos: bool,
    ) -> Result<(), String> {
        let mut packet = ogg_packet {
            packet: data.as_ptr() as *mut u8,
            bytes: data.len() as c_long,
            b_o_s: bos as c_long,
            e_o_s: eos as c_long,
            granulepos,
            packetno: self.packetno,
        };
        self.packet_in(&mut packet)
    }

    /// Writes out every complete page. With `force`, also the partial one.
    pub fn write_pages(&mut self, force: bool) -> io::Result<()> {
        loop {
            let mut page: ogg_page = unsafe { MaybeUninit::zeroed().assume_init() };
            let ready = unsafe {
                if force {
                    ogg_stream_flush(self.stream.as_mut(), &mut page)
                } else {
                    ogg_stream_pageout(self.stream.as_mut(), &mut page)
                }
            };
            if ready == 0 {
                return Ok(());
            }

            let (header, body) = unsafe {
                (
                    slice::from_raw_parts(page.header, page.header_len as usize),
                    slice::from_raw_parts(page.body, page.body_len as usize),
                )
            };
            self.out.write_all(header)?;
            self.out.write_all(body)?;
        }
    }

    /// Flushes the last partial page and the underlying writer.
    pub fn finish(&mut self) -> io::Result<()> {
        self.write_pages(true)?;
        self.out.flush()
    }
}

impl<W: Write> Drop for OggWriter<W> {
    fn drop(&mut self) {
        unsafe {
            ogg_stream_clear(self.stream.as_mut());
        }
    }
}
