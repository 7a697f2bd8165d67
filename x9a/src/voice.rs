//! Voice records: one instrument patch and everything inside it

use crate::{
    name::Name,
    serde::{ReadError, expect_u32_be, read_u8, read_u32_be, write_u32_be},
};
use std::io::{self, Read, Seek, SeekFrom, Write};

// Length tags of the scalar block, doubling as the equalizer presence flag
const SCALARS_LEN: u32 = 0x11;
const SCALARS_WITH_EQ_LEN: u32 = 0x17;

// What the trailing equalizer probe reads when the record ends in slot filler
const EQ2_ABSENT: u32 = 0xFFFF_FFFF;

/// One instrument patch, addressed by a (page, slot) position in the bank
///
/// A voice consists of the control surface settings, the shared delay and
/// reverb sends, four master keyboard zones and the three sound sections
/// (piano, e-piano, sub). The two equalizer blocks and the per-section
/// extensions are optional on the wire; their presence is signaled by length
/// tags which are rederived from the fields on every encode, never stored.
///
/// # Equality
///
/// Two voices are equal when they represent the same patch: omitted optional
/// blocks are substituted with their canonical defaults on both sides before
/// the re-encoded bytes are compared. A voice that stores the default
/// equalizer explicitly therefore equals one that omits it.
#[derive(Debug, Clone, Default)]
pub struct Voice {
    pub name: Name,
    pub unknown: u8,
    pub master_switch: u8,
    pub advanced_zone_switch: u8,
    pub transpose: u8,
    pub split_point: u8,
    pub delay_reverb_section_selection: u8,
    pub modulation_lever_assign: u8,
    pub modulation_lever_limit_low: u8,
    pub modulation_lever_limit_high: u8,
    pub fc1_assign: u8,
    pub fc1_limit_low: u8,
    pub fc1_limit_high: u8,
    pub fc2_assign: u8,
    pub fc2_limit_low: u8,
    pub fc2_limit_high: u8,
    pub live_set_eq: Option<LiveSetEq>,
    pub delay: Delay,
    pub reverb: Reverb,
    pub keyboard_zones: [KeyboardZone; 4],
    pub sections: [Section; 3],
    pub live_set_eq2: Option<LiveSetEq2>,
}

impl Voice {
    /// Parse a voice record from I/O
    ///
    /// The reader is expected to cover the padded payload slot the record
    /// lives in; the probe for the trailing equalizer deliberately runs into
    /// the slot filler when that block is absent.
    pub fn from_reader<R>(mut reader: R) -> Result<Self, ReadError>
    where
        R: Read + Seek,
    {
        expect_u32_be(&mut reader, Name::ENCODED_LEN as u32)?;
        let name = {
            let mut bytes = [0; Name::ENCODED_LEN];
            reader.read_exact(&mut bytes)?;
            Name::from_wire(bytes)?
        };

        let offset = reader.stream_position()?;
        let scalars_len = read_u32_be(&mut reader)?;
        let has_eq = match scalars_len {
            SCALARS_LEN => false,
            SCALARS_WITH_EQ_LEN => true,
            _ => {
                return Err(ReadError::UnexpectedLiteral {
                    offset,
                    expected: format!("{SCALARS_LEN:#x} or {SCALARS_WITH_EQ_LEN:#x}"),
                    found: format!("{scalars_len:#x}"),
                });
            }
        };

        let unknown = read_u8(&mut reader)?;
        let master_switch = read_u8(&mut reader)?;
        let advanced_zone_switch = read_u8(&mut reader)?;
        let transpose = read_u8(&mut reader)?;
        let split_point = read_u8(&mut reader)?;
        let fc1_assign_copy = read_u8(&mut reader)?;
        let fc2_assign_copy = read_u8(&mut reader)?;
        let delay_reverb_section_selection = read_u8(&mut reader)?;
        let modulation_lever_assign = read_u8(&mut reader)?;
        let modulation_lever_limit_low = read_u8(&mut reader)?;
        let modulation_lever_limit_high = read_u8(&mut reader)?;
        let fc1_assign = read_u8(&mut reader)?;
        let fc1_limit_low = read_u8(&mut reader)?;
        let fc1_limit_high = read_u8(&mut reader)?;
        let fc2_assign = read_u8(&mut reader)?;
        let fc2_limit_low = read_u8(&mut reader)?;
        let fc2_limit_high = read_u8(&mut reader)?;

        // The foot controller assignments are stored twice; both copies must agree.
        if fc1_assign_copy != fc1_assign || fc2_assign_copy != fc2_assign {
            return Err(ReadError::CrossCheck(format!(
                "the redundant foot controller assignments disagree \
                 (FC1 {fc1_assign_copy} vs {fc1_assign}, FC2 {fc2_assign_copy} vs {fc2_assign})"
            )));
        }

        let live_set_eq = if has_eq {
            Some(LiveSetEq::from_reader(&mut reader)?)
        } else {
            None
        };

        let delay = Delay::from_reader(&mut reader)?;
        let reverb = Reverb::from_reader(&mut reader)?;

        expect_u32_be(&mut reader, 4)?;
        let keyboard_zones = [
            KeyboardZone::from_reader(&mut reader)?,
            KeyboardZone::from_reader(&mut reader)?,
            KeyboardZone::from_reader(&mut reader)?,
            KeyboardZone::from_reader(&mut reader)?,
        ];

        expect_u32_be(&mut reader, 3)?;
        let sections = [
            Section::from_reader(&mut reader)?,
            Section::from_reader(&mut reader)?,
            Section::from_reader(&mut reader)?,
        ];

        // An absent trailing equalizer is not flagged by a tag of its own; the
        // record simply ends and the probe reads 0xFF slot filler instead.
        let live_set_eq2 = match read_u32_be(&mut reader)? {
            EQ2_ABSENT => None,
            _ => {
                reader.seek(SeekFrom::Current(-4))?;
                Some(LiveSetEq2::from_reader(&mut reader)?)
            }
        };

        Ok(Self {
            name,
            unknown,
            master_switch,
            advanced_zone_switch,
            transpose,
            split_point,
            delay_reverb_section_selection,
            modulation_lever_assign,
            modulation_lever_limit_low,
            modulation_lever_limit_high,
            fc1_assign,
            fc1_limit_low,
            fc1_limit_high,
            fc2_assign,
            fc2_limit_low,
            fc2_limit_high,
            live_set_eq,
            delay,
            reverb,
            keyboard_zones,
            sections,
            live_set_eq2,
        })
    }

    /// Serialize the voice record to I/O
    ///
    /// Every length tag is derived from which optional blocks are present.
    pub fn to_writer<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: Write,
    {
        write_u32_be(&mut writer, Name::ENCODED_LEN as u32)?;
        writer.write_all(self.name.wire_bytes())?;

        let scalars_len = if self.live_set_eq.is_some() {
            SCALARS_WITH_EQ_LEN
        } else {
            SCALARS_LEN
        };
        write_u32_be(&mut writer, scalars_len)?;
        writer.write_all(&[
            self.unknown,
            self.master_switch,
            self.advanced_zone_switch,
            self.transpose,
            self.split_point,
            self.fc1_assign,
            self.fc2_assign,
            self.delay_reverb_section_selection,
            self.modulation_lever_assign,
            self.modulation_lever_limit_low,
            self.modulation_lever_limit_high,
            self.fc1_assign,
            self.fc1_limit_low,
            self.fc1_limit_high,
            self.fc2_assign,
            self.fc2_limit_low,
            self.fc2_limit_high,
        ])?;

        if let Some(eq) = &self.live_set_eq {
            eq.to_writer(&mut writer)?;
        }

        self.delay.to_writer(&mut writer)?;
        self.reverb.to_writer(&mut writer)?;

        write_u32_be(&mut writer, self.keyboard_zones.len() as u32)?;
        for zone in &self.keyboard_zones {
            zone.to_writer(&mut writer)?;
        }

        write_u32_be(&mut writer, self.sections.len() as u32)?;
        for section in &self.sections {
            section.to_writer(&mut writer)?;
        }

        if let Some(eq2) = &self.live_set_eq2 {
            eq2.to_writer(&mut writer)?;
        }

        Ok(())
    }

    /// A copy with canonical defaults substituted for omitted optional blocks
    fn normalized(&self) -> Self {
        let mut voice = self.clone();

        voice.live_set_eq.get_or_insert_with(LiveSetEq::default);
        voice.live_set_eq2.get_or_insert_with(LiveSetEq2::default);
        for section in &mut voice.sections {
            section.extensions = section.extensions.normalized();
        }

        voice
    }

    fn normalized_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.normalized()
            .to_writer(&mut bytes)
            .expect("writing to a Vec cannot fail");
        bytes
    }
}

impl PartialEq for Voice {
    fn eq(&self, other: &Self) -> bool {
        if self.name != other.name {
            return false;
        }

        self.normalized_bytes() == other.normalized_bytes()
    }
}

impl Eq for Voice {}

/// The live set equalizer settings of a voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSetEq {
    pub mode_switch: u8,
    pub on_off: u8,
    pub low_gain: u8,
    pub mid_gain: u8,
    pub mid_gain_frequency: u8,
    pub high_gain: u8,
}

impl LiveSetEq {
    fn from_reader<R>(mut reader: R) -> Result<Self, ReadError>
    where
        R: Read,
    {
        Ok(Self {
            mode_switch: read_u8(&mut reader)?,
            on_off: read_u8(&mut reader)?,
            low_gain: read_u8(&mut reader)?,
            mid_gain: read_u8(&mut reader)?,
            mid_gain_frequency: read_u8(&mut reader)?,
            high_gain: read_u8(&mut reader)?,
        })
    }

    fn to_writer<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: Write,
    {
        writer.write_all(&[
            self.mode_switch,
            self.on_off,
            self.low_gain,
            self.mid_gain,
            self.mid_gain_frequency,
            self.high_gain,
        ])
    }
}

impl Default for LiveSetEq {
    /// The settings the instrument applies when the block is omitted
    fn default() -> Self {
        Self {
            mode_switch: 0,
            on_off: 0,
            low_gain: 64,
            mid_gain: 64,
            mid_gain_frequency: 28,
            high_gain: 64,
        }
    }
}

/// The delay send shared by the sections of a voice
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Delay {
    pub on_off: u8,
    pub delay_type: u8,
    pub time: u8,
    pub feedback: u8,
    pub piano_depth: u8,
    pub e_piano_depth: u8,
    pub sub_depth: u8,
}

impl Delay {
    fn from_reader<R>(mut reader: R) -> Result<Self, ReadError>
    where
        R: Read + Seek,
    {
        expect_u32_be(&mut reader, 0x7)?;

        Ok(Self {
            on_off: read_u8(&mut reader)?,
            delay_type: read_u8(&mut reader)?,
            time: read_u8(&mut reader)?,
            feedback: read_u8(&mut reader)?,
            piano_depth: read_u8(&mut reader)?,
            e_piano_depth: read_u8(&mut reader)?,
            sub_depth: read_u8(&mut reader)?,
        })
    }

    fn to_writer<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: Write,
    {
        write_u32_be(&mut writer, 0x7)?;
        writer.write_all(&[
            self.on_off,
            self.delay_type,
            self.time,
            self.feedback,
            self.piano_depth,
            self.e_piano_depth,
            self.sub_depth,
        ])
    }
}

/// The reverb send shared by the sections of a voice
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reverb {
    pub on_off: u8,
    pub time: u8,
    pub piano_depth: u8,
    pub e_piano_depth: u8,
    pub sub_depth: u8,
}

impl Reverb {
    fn from_reader<R>(mut reader: R) -> Result<Self, ReadError>
    where
        R: Read + Seek,
    {
        expect_u32_be(&mut reader, 0x5)?;

        Ok(Self {
            on_off: read_u8(&mut reader)?,
            time: read_u8(&mut reader)?,
            piano_depth: read_u8(&mut reader)?,
            e_piano_depth: read_u8(&mut reader)?,
            sub_depth: read_u8(&mut reader)?,
        })
    }

    fn to_writer<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: Write,
    {
        write_u32_be(&mut writer, 0x5)?;
        writer.write_all(&[
            self.on_off,
            self.time,
            self.piano_depth,
            self.e_piano_depth,
            self.sub_depth,
        ])
    }
}

/// One of the four master keyboard zones of a voice
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyboardZone {
    pub on_off: u8,
    pub tx_channel: u8,
    pub octave_shift: u8,
    pub transpose: u8,
    pub note_limit_low: u8,
    pub note_limit_high: u8,
    pub tx_note: u8,
    pub tx_bank: u8,
    pub tx_program: u8,
    pub tx_volume: u8,
    pub tx_pan: u8,
    pub tx_pitch_bend: u8,
    pub tx_modulation: u8,
    pub tx_fc1: u8,
    pub tx_fc2: u8,
    pub tx_foot_switch: u8,
    pub tx_sustain: u8,
    pub bank_msb: u8,
    pub bank_lsb: u8,
    pub program_change: u8,
    pub volume: u8,
    pub pan: u8,
}

impl KeyboardZone {
    fn from_reader<R>(mut reader: R) -> Result<Self, ReadError>
    where
        R: Read + Seek,
    {
        expect_u32_be(&mut reader, 0x16)?;

        Ok(Self {
            on_off: read_u8(&mut reader)?,
            tx_channel: read_u8(&mut reader)?,
            octave_shift: read_u8(&mut reader)?,
            transpose: read_u8(&mut reader)?,
            note_limit_low: read_u8(&mut reader)?,
            note_limit_high: read_u8(&mut reader)?,
            tx_note: read_u8(&mut reader)?,
            tx_bank: read_u8(&mut reader)?,
            tx_program: read_u8(&mut reader)?,
            tx_volume: read_u8(&mut reader)?,
            tx_pan: read_u8(&mut reader)?,
            tx_pitch_bend: read_u8(&mut reader)?,
            tx_modulation: read_u8(&mut reader)?,
            tx_fc1: read_u8(&mut reader)?,
            tx_fc2: read_u8(&mut reader)?,
            tx_foot_switch: read_u8(&mut reader)?,
            tx_sustain: read_u8(&mut reader)?,
            bank_msb: read_u8(&mut reader)?,
            bank_lsb: read_u8(&mut reader)?,
            program_change: read_u8(&mut reader)?,
            volume: read_u8(&mut reader)?,
            pan: read_u8(&mut reader)?,
        })
    }

    fn to_writer<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: Write,
    {
        write_u32_be(&mut writer, 0x16)?;
        writer.write_all(&[
            self.on_off,
            self.tx_channel,
            self.octave_shift,
            self.transpose,
            self.note_limit_low,
            self.note_limit_high,
            self.tx_note,
            self.tx_bank,
            self.tx_program,
            self.tx_volume,
            self.tx_pan,
            self.tx_pitch_bend,
            self.tx_modulation,
            self.tx_fc1,
            self.tx_fc2,
            self.tx_foot_switch,
            self.tx_sustain,
            self.bank_msb,
            self.bank_lsb,
            self.program_change,
            self.volume,
            self.pan,
        ])
    }
}

// Length tags of a section's scalar block, selecting 0, 1 or 2 extensions
const SECTION_LEN: u32 = 0x15;
const SECTION_WITH_TOUCH_LEN: u32 = 0x17;
const SECTION_FULL_LEN: u32 = 0x1D;

/// One of the three sound sections of a voice (piano, e-piano, sub)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Section {
    pub voice_category: u8,
    pub voice_number_category1: u8,
    pub voice_number_category2: u8,
    pub voice_number_category3: u8,
    pub voice_number_category4: u8,
    pub voice_advanced_mode_number: u8,
    pub on_off: u8,
    pub split: u8,
    pub octave: u8,
    pub volume: u8,
    pub tone: u8,
    pub pitch_bend_range: u8,
    pub p_mod_depth: u8,
    pub rx_expression: u8,
    pub rx_sustain: u8,
    pub rx_sostenuto: u8,
    pub rx_soft: u8,
    pub delay_depth: u8,
    pub reverb_depth: u8,
    pub advanced_mode_switch: u8,
    pub p_mod_speed: u8,
    pub extensions: SectionExtensions,
    pub dsp: SectionDsp,
}

impl Section {
    fn from_reader<R>(mut reader: R) -> Result<Self, ReadError>
    where
        R: Read + Seek,
    {
        let offset = reader.stream_position()?;
        let scalars_len = read_u32_be(&mut reader)?;
        if !matches!(
            scalars_len,
            SECTION_LEN | SECTION_WITH_TOUCH_LEN | SECTION_FULL_LEN
        ) {
            return Err(ReadError::UnexpectedLiteral {
                offset,
                expected: format!(
                    "{SECTION_LEN:#x}, {SECTION_WITH_TOUCH_LEN:#x} or {SECTION_FULL_LEN:#x}"
                ),
                found: format!("{scalars_len:#x}"),
            });
        }

        let voice_category = read_u8(&mut reader)?;
        let voice_number_category1 = read_u8(&mut reader)?;
        let voice_number_category2 = read_u8(&mut reader)?;
        let voice_number_category3 = read_u8(&mut reader)?;
        let voice_number_category4 = read_u8(&mut reader)?;
        let voice_advanced_mode_number = read_u8(&mut reader)?;
        let on_off = read_u8(&mut reader)?;
        let split = read_u8(&mut reader)?;
        let octave = read_u8(&mut reader)?;
        let volume = read_u8(&mut reader)?;
        let tone = read_u8(&mut reader)?;
        let pitch_bend_range = read_u8(&mut reader)?;
        let p_mod_depth = read_u8(&mut reader)?;
        let rx_expression = read_u8(&mut reader)?;
        let rx_sustain = read_u8(&mut reader)?;
        let rx_sostenuto = read_u8(&mut reader)?;
        let rx_soft = read_u8(&mut reader)?;
        let delay_depth = read_u8(&mut reader)?;
        let reverb_depth = read_u8(&mut reader)?;
        let advanced_mode_switch = read_u8(&mut reader)?;
        let p_mod_speed = read_u8(&mut reader)?;

        let extensions = match scalars_len {
            SECTION_WITH_TOUCH_LEN => {
                SectionExtensions::Touch(TouchSensitivity::from_reader(&mut reader)?)
            }
            SECTION_FULL_LEN => SectionExtensions::Full(
                TouchSensitivity::from_reader(&mut reader)?,
                SoundSettings::from_reader(&mut reader)?,
            ),
            _ => SectionExtensions::None,
        };

        let dsp = SectionDsp::from_reader(&mut reader)?;

        Ok(Self {
            voice_category,
            voice_number_category1,
            voice_number_category2,
            voice_number_category3,
            voice_number_category4,
            voice_advanced_mode_number,
            on_off,
            split,
            octave,
            volume,
            tone,
            pitch_bend_range,
            p_mod_depth,
            rx_expression,
            rx_sustain,
            rx_sostenuto,
            rx_soft,
            delay_depth,
            reverb_depth,
            advanced_mode_switch,
            p_mod_speed,
            extensions,
            dsp,
        })
    }

    fn to_writer<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: Write,
    {
        let scalars_len = match self.extensions {
            SectionExtensions::None => SECTION_LEN,
            SectionExtensions::Touch(_) => SECTION_WITH_TOUCH_LEN,
            SectionExtensions::Full(..) => SECTION_FULL_LEN,
        };
        write_u32_be(&mut writer, scalars_len)?;
        writer.write_all(&[
            self.voice_category,
            self.voice_number_category1,
            self.voice_number_category2,
            self.voice_number_category3,
            self.voice_number_category4,
            self.voice_advanced_mode_number,
            self.on_off,
            self.split,
            self.octave,
            self.volume,
            self.tone,
            self.pitch_bend_range,
            self.p_mod_depth,
            self.rx_expression,
            self.rx_sustain,
            self.rx_sostenuto,
            self.rx_soft,
            self.delay_depth,
            self.reverb_depth,
            self.advanced_mode_switch,
            self.p_mod_speed,
        ])?;

        match &self.extensions {
            SectionExtensions::None => (),
            SectionExtensions::Touch(touch) => touch.to_writer(&mut writer)?,
            SectionExtensions::Full(touch, sound) => {
                touch.to_writer(&mut writer)?;
                sound.to_writer(&mut writer)?;
            }
        }

        self.dsp.to_writer(&mut writer)
    }
}

/// The optional trailing blocks of a [`Section`]
///
/// The sound settings can only be stored together with the touch
/// sensitivity, never on their own.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SectionExtensions {
    #[default]
    None,
    Touch(TouchSensitivity),
    Full(TouchSensitivity, SoundSettings),
}

impl SectionExtensions {
    /// The same extensions with canonical defaults filled in for omitted blocks
    fn normalized(&self) -> Self {
        match self {
            Self::None => Self::Full(TouchSensitivity::default(), SoundSettings::default()),
            Self::Touch(touch) => Self::Full(touch.clone(), SoundSettings::default()),
            Self::Full(..) => self.clone(),
        }
    }
}

/// The touch sensitivity extension of a [`Section`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchSensitivity {
    pub depth: u8,
    pub offset: u8,
}

impl TouchSensitivity {
    fn from_reader<R>(mut reader: R) -> Result<Self, ReadError>
    where
        R: Read,
    {
        Ok(Self {
            depth: read_u8(&mut reader)?,
            offset: read_u8(&mut reader)?,
        })
    }

    fn to_writer<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: Write,
    {
        writer.write_all(&[self.depth, self.offset])
    }
}

impl Default for TouchSensitivity {
    /// The settings the instrument applies when the block is omitted
    fn default() -> Self {
        Self {
            depth: 64,
            offset: 64,
        }
    }
}

/// The sound settings extension of a [`Section`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundSettings {
    pub mono_poly: u8,
    pub portamento_switch: u8,
    pub portamento_time: u8,
    pub portamento_mode: u8,
    pub portamento_time_mode: u8,
    pub pan: u8,
}

impl SoundSettings {
    fn from_reader<R>(mut reader: R) -> Result<Self, ReadError>
    where
        R: Read,
    {
        Ok(Self {
            mono_poly: read_u8(&mut reader)?,
            portamento_switch: read_u8(&mut reader)?,
            portamento_time: read_u8(&mut reader)?,
            portamento_mode: read_u8(&mut reader)?,
            portamento_time_mode: read_u8(&mut reader)?,
            pan: read_u8(&mut reader)?,
        })
    }

    fn to_writer<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: Write,
    {
        writer.write_all(&[
            self.mono_poly,
            self.portamento_switch,
            self.portamento_time,
            self.portamento_mode,
            self.portamento_time_mode,
            self.pan,
        ])
    }
}

impl Default for SoundSettings {
    /// The settings the instrument applies when the block is omitted
    fn default() -> Self {
        Self {
            mono_poly: 1,
            portamento_switch: 0,
            portamento_time: 64,
            portamento_mode: 1,
            portamento_time_mode: 0,
            pan: 64,
        }
    }
}

/// The effect block that unconditionally closes every [`Section`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SectionDsp {
    pub piano_damper_resonance: u8,
    pub piano_dsp_on_off: u8,
    pub piano_dsp_category: u8,
    pub piano_dsp_depth: u8,
    pub e_piano_dsp1_on_off: u8,
    pub e_piano_dsp1_category: u8,
    pub e_piano_dsp1_depth: u8,
    pub e_piano_dsp1_rate: u8,
    pub e_piano_dsp2_on_off: u8,
    pub e_piano_dsp2_category: u8,
    pub e_piano_dsp2_depth: u8,
    pub e_piano_dsp2_speed: u8,
    pub e_piano_drive_on_off: u8,
    pub e_piano_drive_value: u8,
    pub sub_dsp_on_off: u8,
    pub sub_dsp_category: u8,
    pub sub_dsp_depth: u8,
    pub sub_dsp_speed: u8,
    pub sub_dsp_attack: u8,
    pub sub_dsp_release: u8,
}

impl SectionDsp {
    fn from_reader<R>(mut reader: R) -> Result<Self, ReadError>
    where
        R: Read + Seek,
    {
        expect_u32_be(&mut reader, 0x14)?;

        Ok(Self {
            piano_damper_resonance: read_u8(&mut reader)?,
            piano_dsp_on_off: read_u8(&mut reader)?,
            piano_dsp_category: read_u8(&mut reader)?,
            piano_dsp_depth: read_u8(&mut reader)?,
            e_piano_dsp1_on_off: read_u8(&mut reader)?,
            e_piano_dsp1_category: read_u8(&mut reader)?,
            e_piano_dsp1_depth: read_u8(&mut reader)?,
            e_piano_dsp1_rate: read_u8(&mut reader)?,
            e_piano_dsp2_on_off: read_u8(&mut reader)?,
            e_piano_dsp2_category: read_u8(&mut reader)?,
            e_piano_dsp2_depth: read_u8(&mut reader)?,
            e_piano_dsp2_speed: read_u8(&mut reader)?,
            e_piano_drive_on_off: read_u8(&mut reader)?,
            e_piano_drive_value: read_u8(&mut reader)?,
            sub_dsp_on_off: read_u8(&mut reader)?,
            sub_dsp_category: read_u8(&mut reader)?,
            sub_dsp_depth: read_u8(&mut reader)?,
            sub_dsp_speed: read_u8(&mut reader)?,
            sub_dsp_attack: read_u8(&mut reader)?,
            sub_dsp_release: read_u8(&mut reader)?,
        })
    }

    fn to_writer<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: Write,
    {
        write_u32_be(&mut writer, 0x14)?;
        writer.write_all(&[
            self.piano_damper_resonance,
            self.piano_dsp_on_off,
            self.piano_dsp_category,
            self.piano_dsp_depth,
            self.e_piano_dsp1_on_off,
            self.e_piano_dsp1_category,
            self.e_piano_dsp1_depth,
            self.e_piano_dsp1_rate,
            self.e_piano_dsp2_on_off,
            self.e_piano_dsp2_category,
            self.e_piano_dsp2_depth,
            self.e_piano_dsp2_speed,
            self.e_piano_drive_on_off,
            self.e_piano_drive_value,
            self.sub_dsp_on_off,
            self.sub_dsp_category,
            self.sub_dsp_depth,
            self.sub_dsp_speed,
            self.sub_dsp_attack,
            self.sub_dsp_release,
        ])
    }
}

/// The trailing equalizer settings of a voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSetEq2 {
    pub low_gain: u8,
    pub mid_gain: u8,
    pub mid_gain_frequency: u8,
    pub high_gain: u8,
}

impl LiveSetEq2 {
    fn from_reader<R>(mut reader: R) -> Result<Self, ReadError>
    where
        R: Read + Seek,
    {
        expect_u32_be(&mut reader, 0x4)?;

        Ok(Self {
            low_gain: read_u8(&mut reader)?,
            mid_gain: read_u8(&mut reader)?,
            mid_gain_frequency: read_u8(&mut reader)?,
            high_gain: read_u8(&mut reader)?,
        })
    }

    fn to_writer<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: Write,
    {
        write_u32_be(&mut writer, 0x4)?;
        writer.write_all(&[
            self.low_gain,
            self.mid_gain,
            self.mid_gain_frequency,
            self.high_gain,
        ])
    }
}

impl Default for LiveSetEq2 {
    /// The settings the instrument applies when the block is omitted
    fn default() -> Self {
        Self {
            low_gain: 64,
            mid_gain: 64,
            mid_gain_frequency: 64,
            high_gain: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    // Byte offsets into an encoded voice without optional blocks
    const SCALARS_TAG: usize = 20;
    const FIRST_SECTION_TAG: usize = 173;

    fn decode(bytes: &[u8]) -> Result<Voice, ReadError> {
        Voice::from_reader(&mut Cursor::new(bytes))
    }

    /// Encode a voice followed by a stretch of the slot filler the trailing
    /// equalizer probe runs into
    fn encode_padded(voice: &Voice) -> Vec<u8> {
        let mut bytes = Vec::new();
        voice.to_writer(&mut bytes).unwrap();
        bytes.extend_from_slice(&[0xFF; 8]);
        bytes
    }

    #[test]
    fn round_trip_minimal() {
        let voice = Voice::default();
        let decoded = decode(&encode_padded(&voice)).unwrap();

        assert!(decoded.live_set_eq.is_none());
        assert!(decoded.live_set_eq2.is_none());
        assert_eq!(decoded.sections[0].extensions, SectionExtensions::None);
        assert_eq!(decoded, voice);
    }

    #[test]
    fn round_trip_fully_populated() {
        let mut voice = Voice::default();
        voice.name = "Stage Grand".parse().unwrap();
        voice.transpose = 3;
        voice.fc1_assign = 11;
        voice.fc2_assign = 4;
        voice.live_set_eq = Some(LiveSetEq {
            on_off: 1,
            ..LiveSetEq::default()
        });
        voice.keyboard_zones[2].tx_channel = 5;
        voice.sections[1].extensions = SectionExtensions::Full(
            TouchSensitivity {
                depth: 100,
                offset: 20,
            },
            SoundSettings::default(),
        );
        voice.live_set_eq2 = Some(LiveSetEq2 {
            low_gain: 70,
            ..LiveSetEq2::default()
        });

        let bytes = encode_padded(&voice);
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded.name.to_string(), "Stage Grand");
        assert_eq!(decoded.keyboard_zones[2].tx_channel, 5);
        assert_eq!(decoded, voice);

        // A second encode of the decoded voice reproduces the record bytes.
        let mut reencoded = Vec::new();
        decoded.to_writer(&mut reencoded).unwrap();
        assert_eq!(&bytes[..reencoded.len()], reencoded.as_slice());
    }

    #[test]
    fn equalizer_presence_selects_scalar_tag() {
        let bytes = encode_padded(&Voice::default());
        assert_eq!(bytes[SCALARS_TAG..SCALARS_TAG + 4], [0, 0, 0, 0x11]);

        let mut voice = Voice::default();
        voice.live_set_eq = Some(LiveSetEq::default());
        let bytes = encode_padded(&voice);
        assert_eq!(bytes[SCALARS_TAG..SCALARS_TAG + 4], [0, 0, 0, 0x17]);
        assert!(decode(&bytes).unwrap().live_set_eq.is_some());
    }

    #[test]
    fn section_extensions_select_length_tag() {
        let mut voice = Voice::default();
        let bytes = encode_padded(&voice);
        assert_eq!(
            bytes[FIRST_SECTION_TAG..FIRST_SECTION_TAG + 4],
            [0, 0, 0, 0x15]
        );

        voice.sections[0].extensions = SectionExtensions::Touch(TouchSensitivity::default());
        let bytes = encode_padded(&voice);
        assert_eq!(
            bytes[FIRST_SECTION_TAG..FIRST_SECTION_TAG + 4],
            [0, 0, 0, 0x17]
        );
        assert!(matches!(
            decode(&bytes).unwrap().sections[0].extensions,
            SectionExtensions::Touch(_)
        ));

        voice.sections[0].extensions =
            SectionExtensions::Full(TouchSensitivity::default(), SoundSettings::default());
        let bytes = encode_padded(&voice);
        assert_eq!(
            bytes[FIRST_SECTION_TAG..FIRST_SECTION_TAG + 4],
            [0, 0, 0, 0x1D]
        );
        assert!(matches!(
            decode(&bytes).unwrap().sections[0].extensions,
            SectionExtensions::Full(..)
        ));
    }

    #[test]
    fn trailing_equalizer_presence() {
        let without = encode_padded(&Voice::default());

        let mut voice = Voice::default();
        voice.live_set_eq2 = Some(LiveSetEq2::default());
        let with = encode_padded(&voice);

        // The block is 4 bytes of length tag plus 4 bytes of settings.
        assert_eq!(with.len(), without.len() + 8);
        assert!(decode(&with).unwrap().live_set_eq2.is_some());
        assert!(decode(&without).unwrap().live_set_eq2.is_none());
    }

    #[test]
    fn disagreeing_assign_copies_fail() {
        let mut bytes = encode_padded(&Voice::default());

        // First FC1 assignment copy, right after the five leading scalars
        bytes[SCALARS_TAG + 4 + 5] = 7;

        assert!(matches!(
            decode(&bytes),
            Err(ReadError::CrossCheck(_))
        ));
    }

    #[test]
    fn omitted_equalizer_equals_canonical_default() {
        let implicit = Voice::default();

        let mut explicit = Voice::default();
        explicit.live_set_eq = Some(LiveSetEq::default());
        explicit.live_set_eq2 = Some(LiveSetEq2::default());
        assert_eq!(implicit, explicit);

        explicit.live_set_eq = Some(LiveSetEq {
            low_gain: 0,
            ..LiveSetEq::default()
        });
        assert_ne!(implicit, explicit);
    }

    #[test]
    fn omitted_extensions_equal_canonical_defaults() {
        let implicit = Voice::default();

        let mut explicit = Voice::default();
        explicit.sections[0].extensions =
            SectionExtensions::Touch(TouchSensitivity::default());
        assert_eq!(implicit, explicit);

        explicit.sections[0].extensions = SectionExtensions::Touch(TouchSensitivity {
            depth: 0,
            offset: 64,
        });
        assert_ne!(implicit, explicit);
    }

    #[test]
    fn names_short_circuit_equality() {
        let mut left = Voice::default();
        left.name = "Left".parse().unwrap();

        let mut right = left.clone();
        assert_eq!(left, right);

        right.name = "Right".parse().unwrap();
        assert_ne!(left, right);
    }
}
