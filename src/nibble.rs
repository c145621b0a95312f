// 6-and-2 GCR encoding of 5.25" floppies. A mounted block image is expanded
// into 35 nibble-stream tracks at mount time; write-back inverts the
// encoding to recover the original sector order.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::platforms::EmulatorError;

pub const SECTOR_SIZE: usize = 256;
pub const SECTORS_PER_TRACK: usize = 16;
pub const TRACKS_PER_DISK: usize = 35;
pub const BLOCK_IMAGE_SIZE: usize = TRACKS_PER_DISK * SECTORS_PER_TRACK * SECTOR_SIZE; // 143360
pub const NIB_TRACK_SIZE: usize = 0x1A00; // 6656
pub const NIB_IMAGE_SIZE: usize = TRACKS_PER_DISK * NIB_TRACK_SIZE; // 232960

const DEFAULT_VOLUME: u8 = 254;

// The 64 disk nibbles in which no two consecutive zero bits appear.
const WRITE_TABLE: [u8; 64] = [
    0x96, 0x97, 0x9A, 0x9B, 0x9D, 0x9E, 0x9F, 0xA6,
    0xA7, 0xAB, 0xAC, 0xAD, 0xAE, 0xAF, 0xB2, 0xB3,
    0xB4, 0xB5, 0xB6, 0xB7, 0xB9, 0xBA, 0xBB, 0xBC,
    0xBD, 0xBE, 0xBF, 0xCB, 0xCD, 0xCE, 0xCF, 0xD3,
    0xD6, 0xD7, 0xD9, 0xDA, 0xDB, 0xDC, 0xDD, 0xDE,
    0xDF, 0xE5, 0xE6, 0xE7, 0xE9, 0xEA, 0xEB, 0xEC,
    0xED, 0xEE, 0xEF, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6,
    0xF7, 0xF9, 0xFA, 0xFB, 0xFC, 0xFD, 0xFE, 0xFF,
];

fn read_table() -> [u8; 256] {
    let mut table = [0xFFu8; 256];
    for (i, &nib) in WRITE_TABLE.iter().enumerate() {
        table[nib as usize] = i as u8;
    }
    table
}

pub type Interleave = [usize; SECTORS_PER_TRACK];

// Physical sector on disk -> sector offset in the image file.
pub const DO_PHYS_TO_LOGICAL: Interleave =
    [0x0, 0x7, 0xE, 0x6, 0xD, 0x5, 0xC, 0x4, 0xB, 0x3, 0xA, 0x2, 0x9, 0x1, 0x8, 0xF];
pub const PO_PHYS_TO_LOGICAL: Interleave =
    [0x0, 0x8, 0x1, 0x9, 0x2, 0xA, 0x3, 0xB, 0x4, 0xC, 0x5, 0xD, 0x6, 0xE, 0x7, 0xF];

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MediaInterleave {
    DosOrder,
    ProdosOrder,
}

impl MediaInterleave {
    pub fn phys_to_logical(&self) -> &'static Interleave {
        match self {
            MediaInterleave::DosOrder => &DO_PHYS_TO_LOGICAL,
            MediaInterleave::ProdosOrder => &PO_PHYS_TO_LOGICAL,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MediaType {
    BlockOrder(MediaInterleave),
    PreNibble,
    Woz,
}

#[derive(Debug, Clone)]
pub struct MediaDescriptor {
    pub path: PathBuf,
    pub media_type: MediaType,
    pub write_protected: bool,
    pub volume: u8,
}

/// Identify a disk image by extension and size. A wrong size for its
/// extension is a refusal, not a guess.
pub fn identify_media(path: &Path) -> Result<MediaDescriptor, EmulatorError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let len = fs::metadata(path).map_err(|_| EmulatorError::MediaNotFound(path.to_path_buf()))?.len()
        as usize;

    let media_type = match ext.as_str() {
        "do" | "dsk" => {
            expect_size(path, len, BLOCK_IMAGE_SIZE)?;
            MediaType::BlockOrder(MediaInterleave::DosOrder)
        }
        "po" => {
            expect_size(path, len, BLOCK_IMAGE_SIZE)?;
            MediaType::BlockOrder(MediaInterleave::ProdosOrder)
        }
        "nib" => {
            expect_size(path, len, NIB_IMAGE_SIZE)?;
            MediaType::PreNibble
        }
        "woz" => MediaType::Woz,
        other => return Err(EmulatorError::UnknownMediaType(other.to_string())),
    };
    Ok(MediaDescriptor {
        path: path.to_path_buf(),
        media_type,
        // WOZ images are mounted read-only; write-back is not supported.
        write_protected: media_type == MediaType::Woz,
        volume: DEFAULT_VOLUME,
    })
}

fn expect_size(path: &Path, actual: usize, wanted: usize) -> Result<(), EmulatorError> {
    if actual != wanted {
        warn!("{}: {} bytes, expected {}", path.display(), actual, wanted);
        return Err(EmulatorError::BadMediaSize { path: path.to_path_buf(), actual, wanted });
    }
    Ok(())
}

pub struct NibTrack {
    pub data: Vec<u8>,
    pub size: usize,
}

impl NibTrack {
    fn empty() -> Self {
        NibTrack { data: vec![0; NIB_TRACK_SIZE], size: 0 }
    }
}

pub struct NibbleDisk {
    pub tracks: Vec<NibTrack>,
    pub interleave: MediaInterleave,
    pub volume: u8,
}

impl NibbleDisk {
    pub fn empty() -> Self {
        NibbleDisk {
            tracks: (0..TRACKS_PER_DISK).map(|_| NibTrack::empty()).collect(),
            interleave: MediaInterleave::DosOrder,
            volume: DEFAULT_VOLUME,
        }
    }
}

fn encode_44(value: u8) -> [u8; 2] {
    [(value >> 1) | 0xAA, value | 0xAA]
}

fn decode_44(hi: u8, lo: u8) -> u8 {
    ((hi << 1) | 1) & lo
}

/// Prenibblize one 256-byte sector into 342 six-bit values: 86 auxiliary
/// bytes carrying the swapped low bit pairs, then the 256 high-six-bit bytes.
fn prenibble(data: &[u8]) -> [u8; 342] {
    let mut out = [0u8; 342];
    for i in 0..86 {
        let mut v = swap2(data[i]);
        v |= swap2(data[i + 86]) << 2;
        if i + 172 < SECTOR_SIZE {
            v |= swap2(data[i + 172]) << 4;
        }
        out[i] = v;
    }
    for i in 0..SECTOR_SIZE {
        out[86 + i] = data[i] >> 2;
    }
    out
}

fn swap2(b: u8) -> u8 {
    ((b & 1) << 1) | ((b & 2) >> 1)
}

fn postnibble(values: &[u8; 342]) -> [u8; SECTOR_SIZE] {
    let mut out = [0u8; SECTOR_SIZE];
    for i in 0..SECTOR_SIZE {
        out[i] = values[86 + i] << 2;
    }
    for i in 0..86 {
        let v = values[i];
        out[i] |= swap2(v & 3);
        out[i + 86] |= swap2((v >> 2) & 3);
        if i + 172 < SECTOR_SIZE {
            out[i + 172] |= swap2((v >> 4) & 3);
        }
    }
    out
}

/// The 343 on-disk bytes of a data field body: the XOR chain over the 342
/// prenibblized values plus the trailing checksum.
pub fn encode_sector_data(data: &[u8]) -> [u8; 343] {
    let pre = prenibble(data);
    let mut out = [0u8; 343];
    let mut prev = 0u8;
    for i in 0..342 {
        out[i] = WRITE_TABLE[(pre[i] ^ prev) as usize];
        prev = pre[i];
    }
    out[342] = WRITE_TABLE[prev as usize];
    out
}

pub fn decode_sector_data(body: &[u8]) -> Option<[u8; SECTOR_SIZE]> {
    if body.len() < 343 {
        return None;
    }
    let table = read_table();
    let mut values = [0u8; 342];
    let mut acc = 0u8;
    for i in 0..342 {
        let d = table[body[i] as usize];
        if d == 0xFF {
            return None;
        }
        acc ^= d;
        values[i] = acc;
    }
    let check = table[body[342] as usize];
    if check == 0xFF || check != acc {
        return None;
    }
    Some(postnibble(&values))
}

const GAP1: usize = 32;
const GAP2: usize = 6;
const GAP3: usize = 45;

/// Lay one whole track down as a nibble stream: sync gap, then sixteen
/// (address field, gap, data field, gap) groups. Comes out to exactly
/// 6656 nibbles.
pub fn emit_track(track: &mut NibTrack, track_no: u8, volume: u8, sectors: &[u8], interleave: &Interleave) {
    let mut pos = 0;
    let mut put = |track: &mut NibTrack, b: u8| {
        track.data[pos] = b;
        pos += 1;
    };
    for _ in 0..GAP1 {
        put(track, 0xFF);
    }
    for phys in 0..SECTORS_PER_TRACK {
        // Address field.
        put(track, 0xD5);
        put(track, 0xAA);
        put(track, 0x96);
        for b in encode_44(volume).iter() {
            put(track, *b);
        }
        for b in encode_44(track_no).iter() {
            put(track, *b);
        }
        for b in encode_44(phys as u8).iter() {
            put(track, *b);
        }
        for b in encode_44(volume ^ track_no ^ phys as u8).iter() {
            put(track, *b);
        }
        put(track, 0xDE);
        put(track, 0xAA);
        put(track, 0xEB);
        for _ in 0..GAP2 {
            put(track, 0xFF);
        }
        // Data field, pulled through the interleave.
        let logical = interleave[phys];
        let data = &sectors[logical * SECTOR_SIZE..(logical + 1) * SECTOR_SIZE];
        put(track, 0xD5);
        put(track, 0xAA);
        put(track, 0xAD);
        for b in encode_sector_data(data).iter() {
            put(track, *b);
        }
        put(track, 0xDE);
        put(track, 0xAA);
        put(track, 0xEB);
        for _ in 0..GAP3 {
            put(track, 0xFF);
        }
    }
    track.size = pos;
    debug_assert_eq!(pos, NIB_TRACK_SIZE);
}

/// Encode a 140 KiB block image into 35 GCR tracks.
pub fn nibblize_disk(image: &[u8], interleave: MediaInterleave, volume: u8) -> NibbleDisk {
    let mut disk = NibbleDisk::empty();
    disk.interleave = interleave;
    disk.volume = volume;
    let p2l = interleave.phys_to_logical();
    for t in 0..TRACKS_PER_DISK {
        let sectors = &image[t * SECTORS_PER_TRACK * SECTOR_SIZE..(t + 1) * SECTORS_PER_TRACK * SECTOR_SIZE];
        emit_track(&mut disk.tracks[t], t as u8, volume, sectors, p2l);
    }
    disk
}

/// Invert the nibblize: scan each track for address and data fields and
/// rebuild the 140 KiB image in the given sector order. Returns None if any
/// sector is missing or fails its checksum.
pub fn denibblize_disk(disk: &NibbleDisk, interleave: MediaInterleave) -> Option<Vec<u8>> {
    let p2l = interleave.phys_to_logical();
    let mut image = vec![0u8; BLOCK_IMAGE_SIZE];
    for (t, track) in disk.tracks.iter().enumerate() {
        let size = if track.size > 0 { track.size } else { NIB_TRACK_SIZE };
        let data = &track.data[..size];
        let mut found = [false; SECTORS_PER_TRACK];
        let mut i = 0;
        while i + 3 < size * 2 {
            // Scan twice around: a field may straddle the index hole.
            let at = |off: usize| data[(i + off) % size];
            if at(0) == 0xD5 && at(1) == 0xAA && at(2) == 0x96 {
                let track_no = decode_44(at(5), at(6));
                let sector = decode_44(at(7), at(8)) as usize;
                if track_no as usize != t || sector >= SECTORS_PER_TRACK || found[sector] {
                    i += 1;
                    continue;
                }
                // Find the data field prologue within a reasonable window.
                let mut j = i + 14;
                let mut have_data = false;
                while j < i + 64 {
                    if data[j % size] == 0xD5 && data[(j + 1) % size] == 0xAA && data[(j + 2) % size] == 0xAD {
                        have_data = true;
                        break;
                    }
                    j += 1;
                }
                if !have_data {
                    i += 1;
                    continue;
                }
                let mut body = [0u8; 343];
                for (k, b) in body.iter_mut().enumerate() {
                    *b = data[(j + 3 + k) % size];
                }
                let decoded = decode_sector_data(&body)?;
                let logical = p2l[sector];
                let offset = t * SECTORS_PER_TRACK * SECTOR_SIZE + logical * SECTOR_SIZE;
                image[offset..offset + SECTOR_SIZE].copy_from_slice(&decoded);
                found[sector] = true;
                if found.iter().all(|&f| f) {
                    break;
                }
                i = j + 3 + 343;
            } else {
                i += 1;
            }
        }
        if !found.iter().all(|&f| f) {
            warn!("track {}: could not recover all sectors", t);
            return None;
        }
    }
    Some(image)
}

/// Load a pre-nibblized image straight into the track streams.
pub fn load_nib_image(disk: &mut NibbleDisk, data: &[u8]) {
    for t in 0..TRACKS_PER_DISK {
        let src = &data[t * NIB_TRACK_SIZE..(t + 1) * NIB_TRACK_SIZE];
        disk.tracks[t].data[..NIB_TRACK_SIZE].copy_from_slice(src);
        disk.tracks[t].size = NIB_TRACK_SIZE;
    }
}

pub fn write_nib_image(disk: &NibbleDisk) -> Vec<u8> {
    let mut out = vec![0u8; NIB_IMAGE_SIZE];
    for t in 0..TRACKS_PER_DISK {
        let size = if disk.tracks[t].size > 0 { disk.tracks[t].size } else { NIB_TRACK_SIZE };
        let dst = &mut out[t * NIB_TRACK_SIZE..t * NIB_TRACK_SIZE + size.min(NIB_TRACK_SIZE)];
        dst.copy_from_slice(&disk.tracks[t].data[..dst.len()]);
    }
    out
}

/// WOZ v2: INFO/TMAP/TRKS chunks; each mapped whole track's bit stream is
/// byte-aligned into the nibble stream (trailing fractional bits dropped).
pub fn load_woz_image(disk: &mut NibbleDisk, data: &[u8], path: &Path) -> Result<(), EmulatorError> {
    let bad = || EmulatorError::BadWozImage(path.to_path_buf());
    if data.len() < 12 || &data[0..4] != b"WOZ2" {
        return Err(bad());
    }
    let mut tmap: Option<&[u8]> = None;
    let mut trks: Option<&[u8]> = None;
    let mut pos = 12;
    while pos + 8 <= data.len() {
        let id = &data[pos..pos + 4];
        let size = u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]]) as usize;
        let body = data.get(pos + 8..pos + 8 + size).ok_or_else(bad)?;
        match id {
            b"TMAP" => tmap = Some(body),
            b"TRKS" => trks = Some(body),
            _ => {}
        }
        pos += 8 + size;
    }
    let tmap = tmap.ok_or_else(bad)?;
    let trks = trks.ok_or_else(bad)?;
    for t in 0..TRACKS_PER_DISK {
        let entry = tmap[t * 4];
        if entry == 0xFF {
            continue; // unformatted track
        }
        let e = entry as usize * 8;
        if e + 8 > trks.len() {
            return Err(bad());
        }
        let start_block = u16::from_le_bytes([trks[e], trks[e + 1]]) as usize;
        let bit_count = u32::from_le_bytes([trks[e + 4], trks[e + 5], trks[e + 6], trks[e + 7]]) as usize;
        let byte_count = (bit_count / 8).min(NIB_TRACK_SIZE);
        let src = data.get(start_block * 512..start_block * 512 + byte_count).ok_or_else(bad)?;
        disk.tracks[t].data[..byte_count].copy_from_slice(src);
        disk.tracks[t].size = byte_count;
    }
    info!("loaded WOZ image {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sector_data_round_trips() {
        let mut data = [0u8; SECTOR_SIZE];
        for (i, b) in data.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(37).wrapping_add(11);
        }
        let body = encode_sector_data(&data);
        assert_eq!(decode_sector_data(&body), Some(data));
    }

    #[test]
    fn no_nibble_below_0x96_leaves_the_encoder() {
        let data = [0x00u8; SECTOR_SIZE];
        let body = encode_sector_data(&data);
        assert!(body.iter().all(|&b| b >= 0x96));
    }

    #[test]
    fn dos_order_disk_round_trips() {
        let mut image = vec![0u8; BLOCK_IMAGE_SIZE];
        for (i, b) in image.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
        let disk = nibblize_disk(&image, MediaInterleave::DosOrder, DEFAULT_VOLUME);
        let back = denibblize_disk(&disk, MediaInterleave::DosOrder).expect("decode failed");
        assert_eq!(back, image);
    }

    #[test]
    fn prodos_order_disk_round_trips() {
        let mut image = vec![0u8; BLOCK_IMAGE_SIZE];
        for (i, b) in image.iter_mut().enumerate() {
            *b = (i / 3) as u8;
        }
        let disk = nibblize_disk(&image, MediaInterleave::ProdosOrder, DEFAULT_VOLUME);
        let back = denibblize_disk(&disk, MediaInterleave::ProdosOrder).expect("decode failed");
        assert_eq!(back, image);
    }
}
