#[cfg(test)]
mod tests {
    use crate::virtual_machine::isa::Opcode;
    use crate::virtual_machine::program::Word;

    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    const EXPECTED_ISA_HASH: u64 = 0x9c6aa84f0dc11a7d;

    fn fnv1a64(mut h: u64, bytes: &[u8]) -> u64 {
        for b in bytes {
            h ^= *b as u64;
            h = h.wrapping_mul(FNV_PRIME);
        }
        h
    }

    macro_rules! hash_isa {
        (
            $( $(#[$doc:meta])* $name:ident = $opcode:literal, $mnemonic:literal => [ $( $field:ident : $kind:ident ),* $(,)? ] ),* $(,)?
        ) => {{
            let mut h = FNV_OFFSET;
            $(
                h = fnv1a64(h, stringify!($name).as_bytes());
                h = fnv1a64(h, &[Opcode::$name as u8]);
                h = fnv1a64(h, $mnemonic.as_bytes());
                $( h = fnv1a64(h, stringify!($kind).as_bytes()); )*
            )*
            h
        }};
    }

    macro_rules! opcode_table {
        (
            $( $(#[$doc:meta])* $name:ident = $opcode:literal, $mnemonic:literal => [ $( $field:ident : $kind:ident ),* $(,)? ] ),* $(,)?
        ) => {
            [ $( (Opcode::$name, $opcode) ),* ]
        };
    }

    fn current_isa_hash() -> u64 {
        crate::for_each_opcode!(hash_isa)
    }

    #[test]
    #[ignore]
    fn print_isa_hash() {
        println!("ISA_HASH=0x{:016x}", current_isa_hash());
    }

    #[test]
    fn isa_hash_unchanged() {
        assert_eq!(current_isa_hash(), EXPECTED_ISA_HASH);
    }

    #[test]
    fn opcode_numbers_and_arities() {
        let table = crate::for_each_opcode!(opcode_table);
        let expected: [(Word, usize); 9] = [
            (1, 3),
            (2, 3),
            (3, 1),
            (4, 1),
            (5, 2),
            (6, 2),
            (7, 3),
            (8, 3),
            (99, 0),
        ];
        assert_eq!(table.len(), expected.len());
        for ((opcode, number), (want_number, want_arity)) in table.into_iter().zip(expected) {
            assert_eq!(number, want_number);
            assert_eq!(Opcode::try_from(number), Ok(opcode));
            assert_eq!(opcode.arity(), want_arity, "arity of {}", opcode.mnemonic());
        }
    }
}
