use ostinato_midi_io::MidirDriver;

fn main() {
    println!("=== MIDI Input Devices ===");
    let devices = MidirDriver::list_devices();
    if devices.is_empty() {
        println!("  (none found)");
    }
    for dev in &devices {
        println!("  [{}] {}", dev.index, dev.name);
    }
}
