pub mod ast {
    macro_rules! or {
        ($left:expr, $right:expr) => {
            $crate::ast::Node::or($left, $right)
        };
    }

    macro_rules! and {
        ($left:expr, $right:expr) => {
            $crate::ast::Node::and($left, $right)
        };
    }

    macro_rules! operand {
        ($field:expr, $comparator:expr, $literal:expr) => {
            $crate::ast::Node::operand($field, $comparator, $literal)
        };
    }

    pub(crate) use and;
    pub(crate) use operand;
    pub(crate) use or;
}

pub mod records {
    macro_rules! record {
        ($($field:expr => $value:expr),* $(,)?) => {{
            #[allow(unused_mut)]
            let mut record = $crate::value::Record::new();
            $(record.insert($field.to_string(), $crate::value::Value::from($value));)*
            record
        }};
    }

    pub(crate) use record;
}
