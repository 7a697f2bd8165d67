//! The system data record: the instrument's global configuration

use crate::serde::{ReadError, expect_u32_be, read_u8, read_u16_le, write_u32_be, write_u16_le};
use std::io::{self, Read, Seek, Write};

// Length tags of the two blocks that make up the record
const SETTINGS_LEN: u32 = 0x22;
const TUNE_LEN: u32 = 0x4;

/// The device configuration stored alongside the voice bank
///
/// A flat record of the instrument's utility settings. Unlike voices there is
/// exactly one of these per file and nothing in it is optional.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemData {
    pub auto_power_off: u8,
    pub keyboard_octave: u8,
    pub transpose: u8,
    pub local_control: u8,
    pub midi_tx_channel: u8,
    pub midi_rx_channel: u8,
    pub midi_control: u8,
    pub unknown1: u8,
    pub touch_curve: u8,
    pub fixed_velocity: u8,
    pub tx_rx_bank_select: u8,
    pub tx_rx_program_change: u8,
    pub midi_port_midi_in_out: u8,
    pub midi_port_usb_in_out: u8,
    pub display_lights_ins_effect: u8,
    pub display_lights_section: u8,
    pub display_lights_lcd_switch: u8,
    pub value_indication: u8,
    pub switch_direction: u8,
    pub lcd_contrast: u8,
    pub panel_lock_live_set: u8,
    pub panel_lock_piano_e_piano_sub: u8,
    pub panel_lock_delay_reverb: u8,
    pub panel_lock_master_eq: u8,
    pub section_hold: u8,
    pub live_set_view_mode: u8,
    pub foot_switch_assign: u8,
    pub sustain_pedal_type: u8,
    pub power_on_sound_live_set_page: u8,
    pub power_on_sound_live_set_index: u8,
    pub controller_reset: u8,
    pub usb_audio_volume: u8,
    pub midi_device_number: u8,
    pub midi_control_delay: u8,

    /// Stored little-endian, unlike every other integer in the format
    pub master_tune: u16,
    pub unknown2: u8,
    pub unknown3: u8,
}

impl SystemData {
    /// Parse a system data record from I/O
    pub fn from_reader<R>(mut reader: R) -> Result<Self, ReadError>
    where
        R: Read + Seek,
    {
        expect_u32_be(&mut reader, SETTINGS_LEN)?;

        let auto_power_off = read_u8(&mut reader)?;
        let keyboard_octave = read_u8(&mut reader)?;
        let transpose = read_u8(&mut reader)?;
        let local_control = read_u8(&mut reader)?;
        let midi_tx_channel = read_u8(&mut reader)?;
        let midi_rx_channel = read_u8(&mut reader)?;
        let midi_control = read_u8(&mut reader)?;
        let unknown1 = read_u8(&mut reader)?;
        let touch_curve = read_u8(&mut reader)?;
        let fixed_velocity = read_u8(&mut reader)?;
        let tx_rx_bank_select = read_u8(&mut reader)?;
        let tx_rx_program_change = read_u8(&mut reader)?;
        let midi_port_midi_in_out = read_u8(&mut reader)?;
        let midi_port_usb_in_out = read_u8(&mut reader)?;
        let display_lights_ins_effect = read_u8(&mut reader)?;
        let display_lights_section = read_u8(&mut reader)?;
        let display_lights_lcd_switch = read_u8(&mut reader)?;
        let value_indication = read_u8(&mut reader)?;
        let switch_direction = read_u8(&mut reader)?;
        let lcd_contrast = read_u8(&mut reader)?;
        let panel_lock_live_set = read_u8(&mut reader)?;
        let panel_lock_piano_e_piano_sub = read_u8(&mut reader)?;
        let panel_lock_delay_reverb = read_u8(&mut reader)?;
        let panel_lock_master_eq = read_u8(&mut reader)?;
        let section_hold = read_u8(&mut reader)?;
        let live_set_view_mode = read_u8(&mut reader)?;
        let foot_switch_assign = read_u8(&mut reader)?;
        let sustain_pedal_type = read_u8(&mut reader)?;
        let power_on_sound_live_set_page = read_u8(&mut reader)?;
        let power_on_sound_live_set_index = read_u8(&mut reader)?;
        let controller_reset = read_u8(&mut reader)?;
        let usb_audio_volume = read_u8(&mut reader)?;
        let midi_device_number = read_u8(&mut reader)?;
        let midi_control_delay = read_u8(&mut reader)?;

        expect_u32_be(&mut reader, TUNE_LEN)?;
        let master_tune = read_u16_le(&mut reader)?;
        let unknown2 = read_u8(&mut reader)?;
        let unknown3 = read_u8(&mut reader)?;

        Ok(Self {
            auto_power_off,
            keyboard_octave,
            transpose,
            local_control,
            midi_tx_channel,
            midi_rx_channel,
            midi_control,
            unknown1,
            touch_curve,
            fixed_velocity,
            tx_rx_bank_select,
            tx_rx_program_change,
            midi_port_midi_in_out,
            midi_port_usb_in_out,
            display_lights_ins_effect,
            display_lights_section,
            display_lights_lcd_switch,
            value_indication,
            switch_direction,
            lcd_contrast,
            panel_lock_live_set,
            panel_lock_piano_e_piano_sub,
            panel_lock_delay_reverb,
            panel_lock_master_eq,
            section_hold,
            live_set_view_mode,
            foot_switch_assign,
            sustain_pedal_type,
            power_on_sound_live_set_page,
            power_on_sound_live_set_index,
            controller_reset,
            usb_audio_volume,
            midi_device_number,
            midi_control_delay,
            master_tune,
            unknown2,
            unknown3,
        })
    }

    /// Serialize the system data record to I/O
    pub fn to_writer<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: Write,
    {
        write_u32_be(&mut writer, SETTINGS_LEN)?;
        writer.write_all(&[
            self.auto_power_off,
            self.keyboard_octave,
            self.transpose,
            self.local_control,
            self.midi_tx_channel,
            self.midi_rx_channel,
            self.midi_control,
            self.unknown1,
            self.touch_curve,
            self.fixed_velocity,
            self.tx_rx_bank_select,
            self.tx_rx_program_change,
            self.midi_port_midi_in_out,
            self.midi_port_usb_in_out,
            self.display_lights_ins_effect,
            self.display_lights_section,
            self.display_lights_lcd_switch,
            self.value_indication,
            self.switch_direction,
            self.lcd_contrast,
            self.panel_lock_live_set,
            self.panel_lock_piano_e_piano_sub,
            self.panel_lock_delay_reverb,
            self.panel_lock_master_eq,
            self.section_hold,
            self.live_set_view_mode,
            self.foot_switch_assign,
            self.sustain_pedal_type,
            self.power_on_sound_live_set_page,
            self.power_on_sound_live_set_index,
            self.controller_reset,
            self.usb_audio_volume,
            self.midi_device_number,
            self.midi_control_delay,
        ])?;

        write_u32_be(&mut writer, TUNE_LEN)?;
        write_u16_le(&mut writer, self.master_tune)?;
        writer.write_all(&[self.unknown2, self.unknown3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip() {
        let mut system = SystemData::default();
        system.keyboard_octave = 2;
        system.lcd_contrast = 31;
        system.master_tune = 4400;

        let mut bytes = Vec::new();
        system.to_writer(&mut bytes).unwrap();
        assert_eq!(bytes.len(), 46);

        let decoded = SystemData::from_reader(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(decoded, system);
    }

    #[test]
    fn master_tune_is_little_endian() {
        let mut system = SystemData::default();
        system.master_tune = 0x0102;

        let mut bytes = Vec::new();
        system.to_writer(&mut bytes).unwrap();

        assert_eq!(bytes[42..44], [0x02, 0x01]);
    }

    #[test]
    fn wrong_length_tag_fails() {
        let mut bytes = Vec::new();
        SystemData::default().to_writer(&mut bytes).unwrap();
        bytes[3] = 0x23;

        assert!(matches!(
            SystemData::from_reader(&mut Cursor::new(&bytes)),
            Err(ReadError::UnexpectedLiteral { offset: 0, .. })
        ));
    }
}
