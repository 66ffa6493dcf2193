#[cfg(test)]
mod tests {
    use crate::virtual_machine::isa::{
        DUP1, MAX_PUSH_WIDTH, MAX_STACK_REACH, Opcode, PUSH1, SWAP1,
    };

    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    const EXPECTED_ISA_HASH: u64 = 0x197ef9d711f4868b;

    fn fnv1a64(mut h: u64, bytes: &[u8]) -> u64 {
        for b in bytes {
            h ^= *b as u64;
            h = h.wrapping_mul(FNV_PRIME);
        }
        h
    }

    macro_rules! hash_isa {
        (
            $( $(#[$doc:meta])* $name:ident = $byte:literal, $mnemonic:literal ),* $(,)?
        ) => {{
            let mut h = FNV_OFFSET;
            $(
                h = fnv1a64(h, stringify!($name).as_bytes());
                h = fnv1a64(h, &[Opcode::$name.to_byte()]);
                h = fnv1a64(h, $mnemonic.as_bytes());
            )*
            for (prefix, base, count) in [
                ("PUSH", PUSH1, MAX_PUSH_WIDTH),
                ("DUP", DUP1, MAX_STACK_REACH),
                ("SWAP", SWAP1, MAX_STACK_REACH),
            ] {
                h = fnv1a64(h, prefix.as_bytes());
                h = fnv1a64(h, &[base, count]);
            }
            h
        }};
    }

    fn current_isa_hash() -> u64 {
        crate::for_each_instruction!(hash_isa)
    }

    #[test]
    #[ignore]
    fn print_isa_hash() {
        println!("ISA_HASH=0x{:016x}", current_isa_hash());
    }

    /// Bytecode already in circulation decodes differently if this changes.
    #[test]
    fn isa_hash_unchanged() {
        assert_eq!(current_isa_hash(), EXPECTED_ISA_HASH);
    }
}
