//! Frequency / channel conversion for the 2.4 GHz and 5 GHz bands.

/// Converts a radiotap channel frequency in MHz to a channel number.
/// Returns 0 for frequencies outside the known bands.
pub fn freq_to_channel(freq: u32) -> u32 {
    if (2412..=2472).contains(&freq) {
        ((freq - 2412) / 5) + 1
    } else if freq == 2484 {
        14
    } else if (5035..=5865).contains(&freq) {
        ((freq - 5035) / 5) + 7
    } else {
        0
    }
}

/// Converts a channel number to its center frequency in MHz.
/// Returns 0 for channels outside the known bands.
pub fn channel_to_freq(channel: u32) -> u32 {
    if (1..=13).contains(&channel) {
        ((channel - 1) * 5) + 2412
    } else if channel == 14 {
        2484
    } else if (15..=173).contains(&channel) {
        ((channel - 7) * 5) + 5035
    } else {
        0
    }
}
