macro_rules! test_roundtrip {
    ($t:ty, $name:ident) => {
        proptest::proptest! {
            #![proptest_config(proptest::prelude::ProptestConfig{fork: false, ..Default::default()})]
            #[test]
            fn $name(orig: $t) {
                let mut buf = std::io::Cursor::new(Vec::<u8>::new());
                orig.write(&mut buf).unwrap();
                buf.set_position(0);
                let restored = <$t>::read(&mut buf).unwrap();
                assert_eq!(orig, restored);
            }
        }
    };
}

pub(crate) use test_roundtrip;
