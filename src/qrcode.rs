#![forbid(unsafe_code)]
//! QR code encoding.
//!
//! Implements QR Code Model 2: versions 1 to 40, the four error correction levels, and the
//! numeric, alphanumeric and byte segment modes. A [`QrCode`] owns its module grid, so it can be
//! moved freely between threads and outlive the call that built it.
//!
//! # Example
//!
//! ```rust
//! use qrsmith::qrcode::{QrCode, QrCodeEcc};
//!
//! let qr = QrCode::encode_text("Hello, World!", QrCodeEcc::Medium).unwrap();
//! assert_eq!(qr.size(), qr.version().value() as i32 * 4 + 17);
//! ```

/// A QR Code symbol: a square grid of dark and light modules.
///
/// Instances are immutable once built.
///
/// # Creation
///
/// - High-level: [`QrCode::encode_text`] or [`QrCode::encode_binary`].
/// - Mid-level: [`QrCode::encode_segments_advanced`] with hand-made [`QrSegment`]s.
/// - Low-level: [`QrCode::encode_codewords`] with finished data codewords.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QrCode {
    version: Version,
    /// Width and height in modules, `version * 4 + 17`.
    size: i32,
    errorcorrectionlevel: QrCodeEcc,
    mask: Mask,
    /// Row-major, `true` is dark.
    modules: Vec<bool>,
    /// Marks function modules so masking and data placement skip them. Emptied once built.
    isfunction: Vec<bool>,
}

impl QrCode {
    /// Encodes a text string at the given error correction level.
    ///
    /// The smallest version that holds the data is chosen, the mask is chosen automatically, and
    /// the error correction level is never raised above `ecl`.
    ///
    /// # Arguments
    ///
    /// * `text` - The text to encode, as UTF-8.
    /// * `ecl` - Error correction level.
    ///
    /// # Errors
    ///
    /// Returns [`DataTooLong`] if the text does not fit in a version 40 symbol at `ecl`.
    pub fn encode_text(text: &str, ecl: QrCodeEcc) -> Result<Self, DataTooLong> {
        let segs = QrSegment::make_segments(text);
        QrCode::encode_segments_advanced(&segs, ecl, Version::MIN, Version::MAX, None, false)
    }

    /// Encodes arbitrary bytes in byte mode at the given error correction level.
    ///
    /// # Errors
    ///
    /// Returns [`DataTooLong`] if the data does not fit in a version 40 symbol at `ecl`.
    pub fn encode_binary(data: &[u8], ecl: QrCodeEcc) -> Result<Self, DataTooLong> {
        let segs = [QrSegment::make_bytes(data)];
        QrCode::encode_segments_advanced(&segs, ecl, Version::MIN, Version::MAX, None, false)
    }

    /// Encodes a list of segments with full control over the encoding parameters.
    ///
    /// # Arguments
    ///
    /// * `segs` - Segments to concatenate.
    /// * `ecl` - Minimum error correction level.
    /// * `minversion` - Smallest version to try.
    /// * `maxversion` - Largest version to try.
    /// * `mask` - Fixed mask, or `None` to pick the one with the lowest penalty.
    /// * `boostecl` - Raise the error correction level when it costs no extra version.
    ///
    /// # Errors
    ///
    /// Returns [`DataTooLong::SegmentTooLong`] when a segment's character count cannot be
    /// represented, or [`DataTooLong::DataOverCapacity`] when the bits do not fit `maxversion`.
    pub fn encode_segments_advanced(
        segs: &[QrSegment],
        mut ecl: QrCodeEcc,
        minversion: Version,
        maxversion: Version,
        mask: Option<Mask>,
        boostecl: bool,
    ) -> Result<Self, DataTooLong> {
        assert!(minversion <= maxversion, "Invalid version range");

        let mut version = minversion;
        let datausedbits: usize = loop {
            let capacitybits = QrCode::get_num_data_codewords(version, ecl) * 8;
            let used = QrSegment::get_total_bits(segs, version);
            match used {
                Some(n) if n <= capacitybits => break n,
                _ if version >= maxversion => {
                    return Err(match used {
                        None => DataTooLong::SegmentTooLong,
                        Some(n) => DataTooLong::DataOverCapacity(n, capacitybits),
                    });
                }
                _ => version = Version::new(version.value() + 1),
            }
        };

        if boostecl {
            for newecl in [QrCodeEcc::Medium, QrCodeEcc::Quartile, QrCodeEcc::High] {
                if datausedbits <= QrCode::get_num_data_codewords(version, newecl) * 8 {
                    ecl = newecl;
                }
            }
        }

        let capacitybits = QrCode::get_num_data_codewords(version, ecl) * 8;
        let mut bb = BitBuffer::default();
        for seg in segs {
            bb.append_bits(seg.mode.mode_bits(), 4);
            // get_total_bits already rejected counts that overflow the count field
            bb.append_bits(seg.numchars as u32, seg.mode.num_char_count_bits(version));
            bb.extend(&seg.data);
        }
        debug_assert_eq!(bb.len(), datausedbits);

        // Terminator, then pad to a byte boundary
        let terminator = (capacitybits - bb.len()).min(4);
        bb.append_bits(0, terminator as u8);
        let bytepad = bb.len().wrapping_neg() & 7;
        bb.append_bits(0, bytepad as u8);
        debug_assert_eq!(bb.len() % 8, 0);

        for &padbyte in [0xEC, 0x11].iter().cycle() {
            if bb.len() >= capacitybits {
                break;
            }
            bb.append_bits(padbyte, 8);
        }

        Ok(QrCode::encode_codewords(version, ecl, &bb.to_bytes(), mask))
    }

    /// Builds a symbol from finished data codewords.
    ///
    /// This is a low-level API; `datacodewords` must be exactly the data capacity of
    /// `version` at `ecl`.
    pub fn encode_codewords(
        version: Version,
        ecl: QrCodeEcc,
        datacodewords: &[u8],
        mask: Option<Mask>,
    ) -> Self {
        let size = i32::from(version.value()) * 4 + 17;
        let area = (size * size) as usize;
        let mut result = Self {
            version,
            size,
            errorcorrectionlevel: ecl,
            mask: Mask::new(0),
            modules: vec![false; area],
            isfunction: vec![false; area],
        };

        result.draw_function_patterns();
        let allcodewords = result.add_ecc_and_interleave(datacodewords);
        result.draw_codewords(&allcodewords);

        let mask = match mask {
            Some(m) => m,
            None => result.choose_mask(),
        };
        result.mask = mask;
        result.apply_mask(mask);
        result.draw_format_bits(mask);
        result.isfunction = Vec::new();
        result
    }

    /// Returns this QR Code's version, in the range [1, 40].
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns this QR Code's size, in the range [21, 177].
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Returns this QR Code's error correction level.
    pub fn error_correction_level(&self) -> QrCodeEcc {
        self.errorcorrectionlevel
    }

    /// Returns this QR Code's mask, in the range [0, 7].
    pub fn mask(&self) -> Mask {
        self.mask
    }

    /// Returns the color of the module at the given coordinates.
    ///
    /// `true` is dark. Coordinates outside the symbol are light, which is what the quiet zone
    /// needs.
    ///
    /// # Arguments
    ///
    /// * `x` - X-coordinate (0 is left).
    /// * `y` - Y-coordinate (0 is top).
    pub fn get_module(&self, x: i32, y: i32) -> bool {
        let range = 0..self.size;
        range.contains(&x) && range.contains(&y) && self.module(x, y)
    }

    fn index(&self, x: i32, y: i32) -> usize {
        (y * self.size + x) as usize
    }

    fn module(&self, x: i32, y: i32) -> bool {
        self.modules[self.index(x, y)]
    }

    fn set_function_module(&mut self, x: i32, y: i32, isdark: bool) {
        let i = self.index(x, y);
        self.modules[i] = isdark;
        self.isfunction[i] = true;
    }

    /*---- Function patterns ----*/

    fn draw_function_patterns(&mut self) {
        let size = self.size;

        // Timing patterns
        for i in 0..size {
            self.set_function_module(6, i, i % 2 == 0);
            self.set_function_module(i, 6, i % 2 == 0);
        }

        self.draw_finder_pattern(3, 3);
        self.draw_finder_pattern(size - 4, 3);
        self.draw_finder_pattern(3, size - 4);

        // Alignment patterns, skipping the three finder corners
        let positions = self.get_alignment_pattern_positions();
        let last = positions.len().saturating_sub(1);
        for (i, &px) in positions.iter().enumerate() {
            for (j, &py) in positions.iter().enumerate() {
                let corner = (i == 0 && j == 0) || (i == 0 && j == last) || (i == last && j == 0);
                if !corner {
                    self.draw_alignment_pattern(px, py);
                }
            }
        }

        // Placeholder so the format area is reserved before data placement
        self.draw_format_bits(Mask::new(0));
        self.draw_version();
    }

    fn draw_format_bits(&mut self, mask: Mask) {
        let bits: u32 = {
            let data = (self.errorcorrectionlevel.format_bits() << 3) | u32::from(mask.value());
            let mut rem = data;
            for _ in 0..10 {
                rem = (rem << 1) ^ ((rem >> 9) * 0x537);
            }
            ((data << 10) | rem) ^ 0x5412
        };

        // First copy, around the top-left finder
        for i in 0..6 {
            self.set_function_module(8, i, get_bit(bits, i));
        }
        self.set_function_module(8, 7, get_bit(bits, 6));
        self.set_function_module(8, 8, get_bit(bits, 7));
        self.set_function_module(7, 8, get_bit(bits, 8));
        for i in 9..15 {
            self.set_function_module(14 - i, 8, get_bit(bits, i));
        }

        // Second copy, split between the other two finders
        let size = self.size;
        for i in 0..8 {
            self.set_function_module(size - 1 - i, 8, get_bit(bits, i));
        }
        for i in 8..15 {
            self.set_function_module(8, size - 15 + i, get_bit(bits, i));
        }
        self.set_function_module(8, size - 8, true);
    }

    fn draw_version(&mut self) {
        let ver = u32::from(self.version.value());
        if ver < 7 {
            return;
        }
        let bits: u32 = {
            let mut rem = ver;
            for _ in 0..12 {
                rem = (rem << 1) ^ ((rem >> 11) * 0x1F25);
            }
            (ver << 12) | rem
        };
        for i in 0..18 {
            let bit = get_bit(bits, i);
            let a = self.size - 11 + i % 3;
            let b = i / 3;
            self.set_function_module(a, b, bit);
            self.set_function_module(b, a, bit);
        }
    }

    fn draw_finder_pattern(&mut self, x: i32, y: i32) {
        let range = 0..self.size;
        for dy in -4..=4 {
            for dx in -4..=4 {
                let (xx, yy) = (x + dx, y + dy);
                if range.contains(&xx) && range.contains(&yy) {
                    let dist = dx.abs().max(dy.abs());
                    self.set_function_module(xx, yy, dist != 2 && dist != 4);
                }
            }
        }
    }

    fn draw_alignment_pattern(&mut self, x: i32, y: i32) {
        for dy in -2..=2 {
            for dx in -2..=2 {
                self.set_function_module(x + dx, y + dy, dx.abs().max(dy.abs()) != 1);
            }
        }
    }

    /*---- Codewords and masking ----*/

    fn add_ecc_and_interleave(&self, data: &[u8]) -> Vec<u8> {
        let ver = self.version;
        let ecl = self.errorcorrectionlevel;
        assert_eq!(data.len(), QrCode::get_num_data_codewords(ver, ecl), "Illegal argument");

        let numblocks = QrCode::table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, ecl);
        let blockecclen = QrCode::table_get(&ECC_CODEWORDS_PER_BLOCK, ver, ecl);
        let rawcodewords = QrCode::get_num_raw_data_modules(ver) / 8;
        let numshortblocks = numblocks - rawcodewords % numblocks;
        let shortblockdatalen = rawcodewords / numblocks - blockecclen;

        let rs = ReedSolomonGenerator::new(blockecclen);
        let mut blocks: Vec<(&[u8], Vec<u8>)> = Vec::with_capacity(numblocks);
        let mut rest = data;
        for i in 0..numblocks {
            let datlen = shortblockdatalen + usize::from(i >= numshortblocks);
            let (dat, tail) = rest.split_at(datlen);
            blocks.push((dat, rs.compute_remainder(dat)));
            rest = tail;
        }
        debug_assert!(rest.is_empty());

        // Data bytes column by column (long blocks carry one extra), then ECC bytes likewise
        let mut result = Vec::with_capacity(rawcodewords);
        for i in 0..=shortblockdatalen {
            for (dat, _) in &blocks {
                if let Some(&b) = dat.get(i) {
                    result.push(b);
                }
            }
        }
        for i in 0..blockecclen {
            for (_, ecc) in &blocks {
                result.push(ecc[i]);
            }
        }
        debug_assert_eq!(result.len(), rawcodewords);
        result
    }

    fn draw_codewords(&mut self, data: &[u8]) {
        assert_eq!(
            data.len(),
            QrCode::get_num_raw_data_modules(self.version) / 8,
            "Illegal argument"
        );
        let size = self.size;
        let totalbits = data.len() * 8;
        let mut i: usize = 0;
        let mut right = size - 1;
        // Zigzag over column pairs from the right edge, skipping the vertical timing column
        while right >= 1 {
            if right == 6 {
                right = 5;
            }
            let upward = ((right + 1) & 2) == 0;
            for vert in 0..size {
                let y = if upward { size - 1 - vert } else { vert };
                for x in [right, right - 1] {
                    let idx = self.index(x, y);
                    if !self.isfunction[idx] && i < totalbits {
                        self.modules[idx] = get_bit(u32::from(data[i >> 3]), 7 - (i & 7) as i32);
                        i += 1;
                    }
                }
            }
            right -= 2;
        }
        debug_assert_eq!(i, totalbits);
    }

    fn apply_mask(&mut self, mask: Mask) {
        for y in 0..self.size {
            for x in 0..self.size {
                let idx = self.index(x, y);
                if !self.isfunction[idx] && mask.inverts(x, y) {
                    self.modules[idx] = !self.modules[idx];
                }
            }
        }
    }

    fn choose_mask(&mut self) -> Mask {
        let mut best = Mask::new(0);
        let mut minpenalty = i32::MAX;
        for m in 0u8..8 {
            let candidate = Mask::new(m);
            self.apply_mask(candidate);
            self.draw_format_bits(candidate);
            let penalty = self.get_penalty_score();
            if penalty < minpenalty {
                best = candidate;
                minpenalty = penalty;
            }
            // XOR undoes itself
            self.apply_mask(candidate);
        }
        best
    }

    fn get_penalty_score(&self) -> i32 {
        let size = self.size;
        let mut result: i32 = 0;

        for y in 0..size {
            result += self.line_penalty((0..size).map(|x| self.module(x, y)));
        }
        for x in 0..size {
            result += self.line_penalty((0..size).map(|y| self.module(x, y)));
        }

        for y in 0..size - 1 {
            for x in 0..size - 1 {
                let color = self.module(x, y);
                if color == self.module(x + 1, y)
                    && color == self.module(x, y + 1)
                    && color == self.module(x + 1, y + 1)
                {
                    result += PENALTY_N2;
                }
            }
        }

        let dark = self.modules.iter().filter(|&&m| m).count() as i32;
        let total = size * size;
        let k = ((dark * 20 - total * 10).abs() + total - 1) / total - 1;
        result + k * PENALTY_N4
    }

    /// Same-color runs and finder-like patterns along one row or column.
    fn line_penalty(&self, line: impl Iterator<Item = bool>) -> i32 {
        let mut result = 0;
        let mut runcolor = false;
        let mut runlen: i32 = 0;
        let mut history = FinderPenalty::new(self.size);
        for color in line {
            if color == runcolor {
                runlen += 1;
                if runlen == 5 {
                    result += PENALTY_N1;
                } else if runlen > 5 {
                    result += 1;
                }
            } else {
                history.add_history(runlen);
                if !runcolor {
                    result += history.count_patterns() * PENALTY_N3;
                }
                runcolor = color;
                runlen = 1;
            }
        }
        result + history.terminate_and_count(runcolor, runlen) * PENALTY_N3
    }

    /*---- Capacity tables ----*/

    fn get_alignment_pattern_positions(&self) -> Vec<i32> {
        let ver = i32::from(self.version.value());
        if ver == 1 {
            return Vec::new();
        }
        let numalign = ver / 7 + 2;
        let step = if ver == 32 {
            26
        } else {
            (ver * 4 + numalign * 2 + 1) / (numalign * 2 - 2) * 2
        };
        let mut result: Vec<i32> = (0..numalign - 1).map(|i| self.size - 7 - i * step).collect();
        result.push(6);
        result.reverse();
        result
    }

    fn get_num_raw_data_modules(ver: Version) -> usize {
        let ver = usize::from(ver.value());
        let mut result = (16 * ver + 128) * ver + 64;
        if ver >= 2 {
            let numalign = ver / 7 + 2;
            result -= (25 * numalign - 10) * numalign - 55;
            if ver >= 7 {
                result -= 36;
            }
        }
        result
    }

    fn get_num_data_codewords(ver: Version, ecl: QrCodeEcc) -> usize {
        QrCode::get_num_raw_data_modules(ver) / 8
            - QrCode::table_get(&ECC_CODEWORDS_PER_BLOCK, ver, ecl)
                * QrCode::table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, ecl)
    }

    fn table_get(table: &'static [[i8; 41]; 4], ver: Version, ecl: QrCodeEcc) -> usize {
        table[ecl.ordinal()][usize::from(ver.value())] as usize
    }
}

struct ReedSolomonGenerator {
    divisor: Vec<u8>,
}

impl ReedSolomonGenerator {
    fn new(degree: usize) -> Self {
        assert!((1..=30).contains(&degree), "Degree out of range");
        // Coefficients from highest to lowest power, leading 1 omitted
        let mut divisor = vec![0u8; degree];
        divisor[degree - 1] = 1;
        let mut root: u8 = 1;
        for _ in 0..degree {
            for j in 0..degree {
                divisor[j] = Self::multiply(divisor[j], root);
                if j + 1 < degree {
                    divisor[j] ^= divisor[j + 1];
                }
            }
            root = Self::multiply(root, 0x02);
        }
        Self { divisor }
    }

    fn compute_remainder(&self, data: &[u8]) -> Vec<u8> {
        let mut result = vec![0u8; self.divisor.len()];
        for &b in data {
            let factor = b ^ result.remove(0);
            result.push(0);
            for (x, &y) in result.iter_mut().zip(&self.divisor) {
                *x ^= Self::multiply(y, factor);
            }
        }
        result
    }

    /// Product in GF(2^8) modulo x^8 + x^4 + x^3 + x^2 + 1.
    fn multiply(x: u8, y: u8) -> u8 {
        let mut z: u8 = 0;
        for i in (0..8).rev() {
            z = (z << 1) ^ ((z >> 7) * 0x1D);
            z ^= ((y >> i) & 1) * x;
        }
        z
    }
}

struct FinderPenalty {
    qr_size: i32,
    run_history: [i32; 7],
}

impl FinderPenalty {
    fn new(size: i32) -> Self {
        Self {
            qr_size: size,
            run_history: [0; 7],
        }
    }

    fn add_history(&mut self, mut currentrunlength: i32) {
        if self.run_history[0] == 0 {
            // Light border before the first run
            currentrunlength += self.qr_size;
        }
        self.run_history.copy_within(0..6, 1);
        self.run_history[0] = currentrunlength;
    }

    fn count_patterns(&self) -> i32 {
        let rh = &self.run_history;
        let n = rh[1];
        let core = n > 0 && rh[2] == n && rh[3] == n * 3 && rh[4] == n && rh[5] == n;
        i32::from(core && rh[0] >= n * 4 && rh[6] >= n) + i32::from(core && rh[6] >= n * 4 && rh[0] >= n)
    }

    fn terminate_and_count(mut self, currentruncolor: bool, mut currentrunlength: i32) -> i32 {
        if currentruncolor {
            self.add_history(currentrunlength);
            currentrunlength = 0;
        }
        currentrunlength += self.qr_size;
        self.add_history(currentrunlength);
        self.count_patterns()
    }
}

const PENALTY_N1: i32 = 3;
const PENALTY_N2: i32 = 3;
const PENALTY_N3: i32 = 40;
const PENALTY_N4: i32 = 10;

static ECC_CODEWORDS_PER_BLOCK: [[i8; 41]; 4] = [
    [
        -1, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28, 30,
        30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Low
    [
        -1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ], // Medium
    [
        -1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30, 30,
        30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Quartile
    [
        -1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24, 30,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // High
];

static NUM_ERROR_CORRECTION_BLOCKS: [[i8; 41]; 4] = [
    [
        -1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12,
        13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ], // Low
    [
        -1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ], // Medium
    [
        -1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29,
        34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ], // Quartile
    [
        -1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35,
        37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ], // High
];

/// Error correction level for a QR code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum QrCodeEcc {
    /// Tolerates ~7% erroneous codewords.
    Low,
    /// Tolerates ~15% erroneous codewords.
    Medium,
    /// Tolerates ~25% erroneous codewords.
    Quartile,
    /// Tolerates ~30% erroneous codewords.
    High,
}

impl QrCodeEcc {
    fn ordinal(self) -> usize {
        match self {
            QrCodeEcc::Low => 0,
            QrCodeEcc::Medium => 1,
            QrCodeEcc::Quartile => 2,
            QrCodeEcc::High => 3,
        }
    }

    /// The 2-bit value stored in the format information.
    fn format_bits(self) -> u32 {
        match self {
            QrCodeEcc::Low => 1,
            QrCodeEcc::Medium => 0,
            QrCodeEcc::Quartile => 3,
            QrCodeEcc::High => 2,
        }
    }
}

/// A segment of character data, already converted to its bit representation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QrSegment {
    mode: QrSegmentMode,
    numchars: usize,
    data: Vec<bool>,
}

impl QrSegment {
    /// Creates a byte-mode segment.
    pub fn make_bytes(data: &[u8]) -> Self {
        let mut bb = BitBuffer::default();
        for &b in data {
            bb.append_bits(u32::from(b), 8);
        }
        QrSegment::new(QrSegmentMode::Byte, data.len(), bb.0)
    }

    /// Creates a numeric-mode segment.
    ///
    /// # Panics
    ///
    /// Panics if `text` contains anything other than ASCII digits.
    pub fn make_numeric(text: &str) -> Self {
        let mut bb = BitBuffer::default();
        for chunk in text.as_bytes().chunks(3) {
            let value = chunk.iter().fold(0u32, |acc, &b| {
                assert!(b.is_ascii_digit(), "String contains non-numeric characters");
                acc * 10 + u32::from(b - b'0')
            });
            bb.append_bits(value, chunk.len() as u8 * 3 + 1);
        }
        QrSegment::new(QrSegmentMode::Numeric, text.len(), bb.0)
    }

    /// Creates an alphanumeric-mode segment.
    ///
    /// Allowed characters: 0–9, A–Z (uppercase), space, `$`, `%`, `*`, `+`, `-`, `.`, `/`, `:`.
    ///
    /// # Panics
    ///
    /// Panics if `text` contains a character outside that set.
    pub fn make_alphanumeric(text: &str) -> Self {
        let mut bb = BitBuffer::default();
        let codes: Vec<u32> = text
            .chars()
            .map(|c| {
                let i = ALPHANUMERIC_CHARSET
                    .find(c)
                    .expect("String contains unencodable characters in alphanumeric mode");
                i as u32
            })
            .collect();
        for pair in codes.chunks(2) {
            match pair {
                [a, b] => bb.append_bits(a * 45 + b, 11),
                [a] => bb.append_bits(*a, 6),
                _ => unreachable!(),
            }
        }
        QrSegment::new(QrSegmentMode::Alphanumeric, codes.len(), bb.0)
    }

    /// Picks the most compact single mode for `text`. Empty text yields no segments.
    pub fn make_segments(text: &str) -> Vec<Self> {
        if text.is_empty() {
            Vec::new()
        } else if QrSegment::is_numeric(text) {
            vec![QrSegment::make_numeric(text)]
        } else if QrSegment::is_alphanumeric(text) {
            vec![QrSegment::make_alphanumeric(text)]
        } else {
            vec![QrSegment::make_bytes(text.as_bytes())]
        }
    }

    pub fn new(mode: QrSegmentMode, numchars: usize, data: Vec<bool>) -> Self {
        Self { mode, numchars, data }
    }

    pub fn mode(&self) -> QrSegmentMode {
        self.mode
    }

    pub fn num_chars(&self) -> usize {
        self.numchars
    }

    /// Header plus payload bits at `version`, or `None` if a character count does not fit
    /// its count field.
    fn get_total_bits(segs: &[Self], version: Version) -> Option<usize> {
        let mut result: usize = 0;
        for seg in segs {
            let ccbits = seg.mode.num_char_count_bits(version);
            if seg.numchars >= 1usize << ccbits {
                return None;
            }
            result = result.checked_add(4 + usize::from(ccbits))?;
            result = result.checked_add(seg.data.len())?;
        }
        Some(result)
    }

    pub fn is_numeric(text: &str) -> bool {
        text.chars().all(|c| c.is_ascii_digit())
    }

    pub fn is_alphanumeric(text: &str) -> bool {
        text.chars().all(|c| ALPHANUMERIC_CHARSET.contains(c))
    }
}

static ALPHANUMERIC_CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// Segment encoding mode.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum QrSegmentMode {
    Numeric,
    Alphanumeric,
    Byte,
}

impl QrSegmentMode {
    fn mode_bits(self) -> u32 {
        match self {
            QrSegmentMode::Numeric => 0x1,
            QrSegmentMode::Alphanumeric => 0x2,
            QrSegmentMode::Byte => 0x4,
        }
    }

    fn num_char_count_bits(self, ver: Version) -> u8 {
        let widths = match self {
            QrSegmentMode::Numeric => [10, 12, 14],
            QrSegmentMode::Alphanumeric => [9, 11, 13],
            QrSegmentMode::Byte => [8, 16, 16],
        };
        widths[usize::from((ver.value() + 7) / 17)]
    }
}

/// An appendable sequence of bits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitBuffer(pub Vec<bool>);

impl BitBuffer {
    /// Appends the low `len` bits of `val`, most significant first.
    pub fn append_bits(&mut self, val: u32, len: u8) {
        assert!(len <= 31 && (val >> len) == 0, "Value out of range");
        self.0.extend((0..len).rev().map(|i| get_bit(val, i32::from(i))));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn extend(&mut self, bits: &[bool]) {
        self.0.extend_from_slice(bits);
    }

    /// Packs the bits big-endian; a trailing partial byte is zero-filled.
    fn to_bytes(&self) -> Vec<u8> {
        self.0
            .chunks(8)
            .map(|byte| {
                byte.iter()
                    .enumerate()
                    .fold(0u8, |acc, (i, &bit)| acc | (u8::from(bit) << (7 - i)))
            })
            .collect()
    }
}

/// The data does not fit in any allowed version.
///
/// Ways to handle it: lower the error correction level, widen the version range, shorten the
/// data, or report it to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataTooLong {
    /// A segment's character count does not fit its count field.
    #[error("segment too long")]
    SegmentTooLong,
    /// Data bits used, and the capacity in bits of the largest allowed version.
    #[error("data length = {0} bits, max capacity = {1} bits")]
    DataOverCapacity(usize, usize),
}

/// A QR code version (1–40).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct Version(u8);

impl Version {
    /// The minimum version number supported in the QR Code Model 2 standard.
    pub const MIN: Version = Version(1);

    /// The maximum version number supported in the QR Code Model 2 standard.
    pub const MAX: Version = Version(40);

    /// Creates a version object from the given number.
    ///
    /// # Panics
    ///
    /// Panics if the number is outside the range [1, 40].
    pub const fn new(ver: u8) -> Self {
        assert!(
            Version::MIN.value() <= ver && ver <= Version::MAX.value(),
            "Version number out of range"
        );
        Self(ver)
    }

    /// Returns the value, which is in the range [1, 40].
    pub const fn value(self) -> u8 {
        self.0
    }
}

/// A mask pattern (0–7).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct Mask(u8);

impl Mask {
    /// Creates a mask object from the given number.
    ///
    /// # Panics
    ///
    /// Panics if the number is outside the range [0, 7].
    pub const fn new(mask: u8) -> Self {
        assert!(mask <= 7, "Mask value out of range");
        Self(mask)
    }

    /// Returns the value, which is in the range [0, 7].
    pub const fn value(self) -> u8 {
        self.0
    }

    fn inverts(self, x: i32, y: i32) -> bool {
        match self.0 {
            0 => (x + y) % 2 == 0,
            1 => y % 2 == 0,
            2 => x % 3 == 0,
            3 => (x + y) % 3 == 0,
            4 => (x / 3 + y / 2) % 2 == 0,
            5 => x * y % 2 + x * y % 3 == 0,
            6 => (x * y % 2 + x * y % 3) % 2 == 0,
            7 => ((x + y) % 2 + x * y % 3) % 2 == 0,
            _ => unreachable!(),
        }
    }
}

fn get_bit(x: u32, i: i32) -> bool {
    ((x >> i) & 1) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric() {
        assert!(QrSegment::is_numeric("1234567890"));
        assert!(!QrSegment::is_numeric("1234abc"));
    }

    #[test]
    fn test_is_alphanumeric() {
        assert!(QrSegment::is_alphanumeric("HELLO WORLD"));
        assert!(!QrSegment::is_alphanumeric("Hello World"));
    }

    #[test]
    fn test_segment_mode_selection() {
        assert_eq!(QrSegment::make_segments("0123")[0].mode(), QrSegmentMode::Numeric);
        assert_eq!(QrSegment::make_segments("HTTPS://X.Y")[0].mode(), QrSegmentMode::Alphanumeric);
        assert_eq!(QrSegment::make_segments("https://x.y")[0].mode(), QrSegmentMode::Byte);
        assert!(QrSegment::make_segments("").is_empty());
    }

    #[test]
    fn test_numeric_bit_lengths() {
        // 3 digits -> 10 bits, 2 digits -> 7 bits, 1 digit -> 4 bits
        assert_eq!(QrSegment::make_numeric("123").data.len(), 10);
        assert_eq!(QrSegment::make_numeric("12345").data.len(), 17);
        assert_eq!(QrSegment::make_numeric("1234").data.len(), 14);
    }

    #[test]
    fn test_alphanumeric_bits() {
        // "AC-42" from ISO/IEC 18004 annex: 00111001110 11100111001 000010
        let seg = QrSegment::make_alphanumeric("AC-42");
        let expected = "0011100111011100111001000010";
        let actual: String = seg.data.iter().map(|&b| if b { '1' } else { '0' }).collect();
        assert_eq!(actual, expected);
        assert_eq!(seg.num_chars(), 5);
    }

    #[test]
    fn test_hello_world_is_version_1() {
        let qr = QrCode::encode_text("Hello, world!", QrCodeEcc::Low).unwrap();
        assert_eq!(qr.version(), Version::new(1));
        assert_eq!(qr.size(), 21);
        assert_eq!(qr.error_correction_level(), QrCodeEcc::Low);
    }

    #[test]
    fn test_finder_patterns_present() {
        let qr = QrCode::encode_text("finder", QrCodeEcc::Medium).unwrap();
        let s = qr.size();
        for (cx, cy) in [(3, 3), (s - 4, 3), (3, s - 4)] {
            assert!(qr.get_module(cx, cy), "finder center must be dark");
            assert!(!qr.get_module(cx + 2, cy), "finder ring must be light");
            assert!(qr.get_module(cx + 3, cy), "finder border must be dark");
        }
        // Dark module next to the bottom-left format area
        assert!(qr.get_module(8, s - 8));
    }

    #[test]
    fn test_out_of_bounds_is_light() {
        let qr = QrCode::encode_text("quiet", QrCodeEcc::Low).unwrap();
        assert!(!qr.get_module(-1, 0));
        assert!(!qr.get_module(0, qr.size()));
    }

    #[test]
    fn test_fixed_mask_is_respected() {
        let segs = QrSegment::make_segments("mask");
        let qr = QrCode::encode_segments_advanced(
            &segs,
            QrCodeEcc::Low,
            Version::MIN,
            Version::MAX,
            Some(Mask::new(5)),
            false,
        )
        .unwrap();
        assert_eq!(qr.mask(), Mask::new(5));
    }

    #[test]
    fn test_boost_ecl_raises_level() {
        let segs = QrSegment::make_segments("1");
        let qr = QrCode::encode_segments_advanced(
            &segs,
            QrCodeEcc::Low,
            Version::MIN,
            Version::MAX,
            None,
            true,
        )
        .unwrap();
        assert_eq!(qr.error_correction_level(), QrCodeEcc::High);
    }

    #[test]
    fn test_version_40_needs_version_information() {
        let digits = "7".repeat(5000);
        let qr = QrCode::encode_text(&digits, QrCodeEcc::Low).unwrap();
        assert!(qr.version().value() >= 7);
        assert_eq!(qr.size(), i32::from(qr.version().value()) * 4 + 17);
    }

    #[test]
    fn test_data_over_capacity() {
        // Byte mode tops out at 2331 bytes at Medium
        let text = "a".repeat(2332);
        match QrCode::encode_text(&text, QrCodeEcc::Medium) {
            Err(DataTooLong::DataOverCapacity(used, cap)) => assert!(used > cap),
            other => panic!("expected capacity error, got {:?}", other.map(|q| q.version())),
        }
        assert!(QrCode::encode_text(&"a".repeat(2331), QrCodeEcc::Medium).is_ok());
    }

    #[test]
    fn test_deterministic() {
        let a = QrCode::encode_text("same input", QrCodeEcc::Medium).unwrap();
        let b = QrCode::encode_text("same input", QrCodeEcc::Medium).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_reed_solomon_multiply() {
        assert_eq!(ReedSolomonGenerator::multiply(0, 0x53), 0);
        assert_eq!(ReedSolomonGenerator::multiply(1, 0x53), 0x53);
        assert_eq!(ReedSolomonGenerator::multiply(0x80, 0x02), 0x1D);
    }

    #[test]
    fn test_bit_buffer_packing() {
        let mut bb = BitBuffer::default();
        bb.append_bits(0b101, 3);
        bb.append_bits(0xFF, 8);
        assert_eq!(bb.len(), 11);
        assert_eq!(bb.to_bytes(), vec![0b1011_1111, 0b1110_0000]);
    }
}
