binary_layout::binary_layout!(dmx_frame_layout, LittleEndian, {
    start_code: u8,
    slots: [u8],
});
