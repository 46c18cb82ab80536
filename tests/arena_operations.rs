//! End-to-end coverage of the arena surface: typed access, in-place
//! overwrites, splits, iteration and snapshot adoption, exercised the way an
//! embedding application would drive them.

use docbuf::{Arena, Type};

mod scalar_access {
    use super::*;

    #[test]
    fn set_then_get_with_exact_used_accounting() {
        let mut arena = Arena::new();
        arena.init_object().unwrap();
        arena.set_i64(0, "age", 30).unwrap();

        assert_eq!(arena.get_i64(0, "age").unwrap(), 30);
        assert_eq!(arena.get_type(0, "age").unwrap(), Type::Int64);
        // 96-byte root + tag(1) + "age"(3) + NUL(1) + type(1) + i64(8)
        assert_eq!(arena.used(), 96 + 14);
    }

    #[test]
    fn every_scalar_type_roundtrips() {
        let mut arena = Arena::new();
        arena.init_object().unwrap();
        arena.set_null(0, "n").unwrap();
        arena.set_bool(0, "b", true).unwrap();
        arena.set_i64(0, "i", i64::MIN).unwrap();
        arena.set_f64(0, "f", -0.25).unwrap();
        arena.set_str(0, "s", "text").unwrap();
        arena.set_bytes(0, "y", &[0, 255, 7]).unwrap();

        assert_eq!(arena.get_type(0, "n").unwrap(), Type::Null);
        assert!(arena.get_bool(0, "b").unwrap());
        assert_eq!(arena.get_i64(0, "i").unwrap(), i64::MIN);
        assert_eq!(arena.get_f64(0, "f").unwrap(), -0.25);
        assert_eq!(arena.get_str(0, "s").unwrap(), "text");
        assert_eq!(arena.get_bytes(0, "y").unwrap(), &[0, 255, 7]);
    }

    #[test]
    fn get_with_wrong_type_is_a_type_mismatch() {
        let mut arena = Arena::new();
        arena.init_object().unwrap();
        arena.set_str(0, "name", "x").unwrap();

        let err = arena.get_i64(0, "name").unwrap_err();
        assert!(err.to_string().contains("type mismatch"));
    }

    #[test]
    fn get_of_absent_key_is_not_found() {
        let mut arena = Arena::new();
        arena.init_object().unwrap();

        let err = arena.get_str(0, "ghost").unwrap_err();
        assert!(err.to_string().contains("not found"));
        let err = arena.get_type(0, "ghost").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}

mod overwrites {
    use super::*;

    #[test]
    fn interleaved_updates_return_latest_values() {
        let mut arena = Arena::new();
        arena.init_object().unwrap();
        arena.set_str(0, "config", "v1.0").unwrap();
        arena.set_i64(0, "id", 100).unwrap();
        arena.set_str(0, "config", "v1.1").unwrap();
        arena.set_i64(0, "id", 101).unwrap();
        arena.set_bool(0, "active", true).unwrap();

        assert_eq!(arena.get_str(0, "config").unwrap(), "v1.1");
        assert_eq!(arena.get_i64(0, "id").unwrap(), 101);
        assert!(arena.get_bool(0, "active").unwrap());
    }

    #[test]
    fn equal_width_update_does_not_grow_the_arena() {
        let mut arena = Arena::new();
        arena.init_object().unwrap();
        arena.set_str(0, "config", "v1.0").unwrap();
        arena.set_i64(0, "id", 100).unwrap();
        let before = arena.used();

        arena.set_str(0, "config", "v1.1").unwrap();
        arena.set_i64(0, "id", 101).unwrap();

        assert_eq!(arena.used(), before);
    }

    #[test]
    fn width_changing_update_grows_the_arena() {
        let mut arena = Arena::new();
        arena.init_object().unwrap();
        arena.set_str(0, "k", "short").unwrap();
        let before = arena.used();

        arena.set_str(0, "k", "a considerably longer value").unwrap();

        assert!(arena.used() > before);
        assert_eq!(arena.get_str(0, "k").unwrap(), "a considerably longer value");
    }

    #[test]
    fn setting_the_same_pair_twice_changes_nothing_observable() {
        let mut once = Arena::new();
        once.init_object().unwrap();
        once.set_str(0, "k", "v").unwrap();

        let mut twice = Arena::new();
        twice.init_object().unwrap();
        twice.set_str(0, "k", "v").unwrap();
        twice.set_str(0, "k", "v").unwrap();

        assert_eq!(
            once.get_str(0, "k").unwrap(),
            twice.get_str(0, "k").unwrap()
        );
        assert_eq!(once.used(), twice.used());
    }
}

mod splits {
    use super::*;

    #[test]
    fn eight_keys_survive_the_root_split() {
        let mut arena = Arena::new();
        arena.init_object().unwrap();
        for i in 0..8 {
            arena.set_i64(0, &format!("k{}", i), i).unwrap();
        }

        for i in 0..8 {
            assert_eq!(arena.get_i64(0, &format!("k{}", i)).unwrap(), i);
        }
        assert_eq!(arena.get_i64(0, "k5").unwrap(), 5);
    }

    #[test]
    fn fifty_keys_survive_non_root_splits() {
        let mut arena = Arena::new();
        arena.init_object().unwrap();
        for i in 0..50 {
            arena.set_i64(0, &format!("key{:02}", i), i * 7).unwrap();
        }

        for i in 0..50 {
            assert_eq!(arena.get_i64(0, &format!("key{:02}", i)).unwrap(), i * 7);
        }
    }

    #[test]
    fn hundreds_of_keys_with_updates() {
        let mut arena = Arena::new();
        arena.init_object().unwrap();
        for i in 0..300 {
            arena.set_i64(0, &format!("entry-{}", i), i).unwrap();
        }
        for i in (0..300).step_by(3) {
            arena.set_i64(0, &format!("entry-{}", i), -i).unwrap();
        }

        for i in 0..300 {
            let expected = if i % 3 == 0 { -i } else { i };
            assert_eq!(
                arena.get_i64(0, &format!("entry-{}", i)).unwrap(),
                expected,
                "entry-{}",
                i
            );
        }
    }
}

mod arrays {
    use super::*;

    #[test]
    fn append_and_get_in_order() {
        let mut arena = Arena::new();
        arena.init_array().unwrap();
        arena.arr_append_str(0, "hello").unwrap();
        arena.arr_append_str(0, "world").unwrap();

        assert_eq!(arena.arr_get_str(0, 0).unwrap(), "hello");
        assert_eq!(arena.arr_get_str(0, 1).unwrap(), "world");

        let err = arena.arr_get_type(0, 2).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn out_of_range_typed_get_is_not_found() {
        let mut arena = Arena::new();
        arena.init_array().unwrap();
        arena.arr_append_i64(0, 1).unwrap();

        let err = arena.arr_get_i64(0, 9).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn large_arrays_keep_positional_order() {
        let mut arena = Arena::new();
        arena.init_array().unwrap();
        for i in 0..200 {
            arena.arr_append_i64(0, i as i64 * 11).unwrap();
        }

        assert_eq!(arena.arr_len(0).unwrap(), 200);
        for i in 0..200u32 {
            assert_eq!(arena.arr_get_i64(0, i).unwrap(), i as i64 * 11);
        }
    }
}

mod nesting {
    use super::*;

    #[test]
    fn builds_a_realistic_document() {
        let mut arena = Arena::new();
        arena.init_object().unwrap();
        arena.set_str(0, "service", "gateway").unwrap();

        let limits = arena.set_obj(0, "limits").unwrap();
        arena.set_i64(limits, "max_conns", 512).unwrap();
        arena.set_f64(limits, "timeout_s", 2.5).unwrap();

        let hosts = arena.set_arr(0, "hosts").unwrap();
        for host in ["alpha.internal", "beta.internal"] {
            arena.arr_append_str(hosts, host).unwrap();
        }
        let probe = arena.arr_append_obj(hosts).unwrap();
        arena.set_bool(probe, "healthy", true).unwrap();

        let limits = arena.get_obj(0, "limits").unwrap();
        assert_eq!(arena.get_i64(limits, "max_conns").unwrap(), 512);

        let hosts = arena.get_arr(0, "hosts").unwrap();
        assert_eq!(arena.arr_len(hosts).unwrap(), 3);
        assert_eq!(arena.arr_get_str(hosts, 1).unwrap(), "beta.internal");
        let probe = arena.arr_get_obj(hosts, 2).unwrap();
        assert!(arena.get_bool(probe, "healthy").unwrap());
    }

    #[test]
    fn deep_nesting_stays_addressable() {
        let mut arena = Arena::new();
        arena.init_object().unwrap();
        let mut ofs = 0;
        for depth in 0..16 {
            ofs = arena.set_obj(ofs, &format!("level{}", depth)).unwrap();
        }
        arena.set_i64(ofs, "bottom", 99).unwrap();

        let mut ofs = 0;
        for depth in 0..16 {
            ofs = arena.get_obj(ofs, &format!("level{}", depth)).unwrap();
        }
        assert_eq!(arena.get_i64(ofs, "bottom").unwrap(), 99);
    }
}

mod iteration {
    use super::*;

    #[test]
    fn entries_cover_every_key_exactly_once() {
        let mut arena = Arena::new();
        arena.init_object().unwrap();
        let mut expected: Vec<String> = (0..40).map(|i| format!("w{}", i)).collect();
        for key in &expected {
            arena.set_bool(0, key, true).unwrap();
        }

        let mut seen: Vec<String> = arena
            .entries(0)
            .map(|e| e.unwrap().key.to_string())
            .collect();
        seen.sort();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn detached_cursor_is_invalidated_by_mutation() {
        let mut arena = Arena::new();
        arena.init_object().unwrap();
        arena.set_i64(0, "a", 1).unwrap();
        arena.set_i64(0, "b", 2).unwrap();

        let mut cursor = arena.cursor(0);
        assert!(cursor.next(&arena).unwrap().is_ok());

        arena.set_i64(0, "c", 3).unwrap();

        let err = cursor.next(&arena).unwrap().unwrap_err();
        assert!(err.to_string().contains("invalidated"));
        assert!(cursor.next(&arena).is_none());
    }
}

mod snapshots {
    use super::*;

    #[test]
    fn adopting_the_used_prefix_reproduces_all_getters() {
        let mut arena = Arena::new();
        arena.init_object().unwrap();
        for i in 0..30 {
            arena.set_i64(0, &format!("s{}", i), i * i).unwrap();
        }
        let nested = arena.set_arr(0, "list").unwrap();
        arena.arr_append_str(nested, "kept").unwrap();

        let snapshot = arena.data().to_vec();
        assert_eq!(snapshot.len(), arena.used());

        let adopted = Arena::from_bytes(snapshot);
        for i in 0..30 {
            assert_eq!(adopted.get_i64(0, &format!("s{}", i)).unwrap(), i * i);
        }
        let nested = adopted.get_arr(0, "list").unwrap();
        assert_eq!(adopted.arr_get_str(nested, 0).unwrap(), "kept");
    }

    #[test]
    fn adopted_snapshot_remains_mutable() {
        let mut arena = Arena::new();
        arena.init_object().unwrap();
        arena.set_i64(0, "x", 1).unwrap();

        let mut adopted = Arena::from_bytes(arena.data().to_vec());
        adopted.set_i64(0, "y", 2).unwrap();

        assert_eq!(adopted.get_i64(0, "x").unwrap(), 1);
        assert_eq!(adopted.get_i64(0, "y").unwrap(), 2);
    }
}
