//! Builds the standard spend script for an address, prints its hex and its
//! disassembly.

use clap::{Arg, ArgAction, Command};

use ferrite_messages::{
    address::{decode_address, Network},
    script::{disasm_string, pay_to_addr_script},
};

fn main() {
    let matches = Command::new("pay-to-addr")
        .version("0.1.0")
        .about("Creates a script which pays to an address")
        .arg(
            Arg::new("ADDRESS")
                .help("The address to pay to")
                .default_value("12gpXQVcCL2qhTNQgyLVdCFG2Qs2px98nV"),
        )
        .arg(
            Arg::new("testnet")
                .short('t')
                .long("testnet")
                .action(ArgAction::SetTrue)
                .help("Decode the address against the test network"),
        )
        .get_matches();

    let network = if matches.get_flag("testnet") {
        Network::Testnet
    } else {
        Network::Mainnet
    };
    let text = matches
        .get_one::<String>("ADDRESS")
        .expect("has a default value");

    let address = match decode_address(text, network) {
        Ok(address) => address,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    let script = match pay_to_addr_script(&address) {
        Ok(script) => script,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    println!("Script Hex: {}", script.to_hex());

    match disasm_string(&script.to_bytes()) {
        Ok(disasm) => println!("Script Disassembly: {}", disasm),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
