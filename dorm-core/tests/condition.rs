#[cfg(test)]
mod tests {
    use dorm_core::{Condition, ConditionTree, Logic, Operator, Value, Where};

    fn placeholders(sql: &str) -> usize {
        sql.matches('?').count()
    }

    #[test]
    fn condition_single() {
        let (sql, args) = Condition::new("age", Operator::Ge, 18).parse();
        assert_eq!(sql, "age >= ?");
        assert_eq!(args, vec![Value::Int64(18)]);
        let (sql, args) = Condition::new("name", Operator::Ne, "bob").parse();
        assert_eq!(sql, "name != ?");
        assert_eq!(args, vec![Value::Varchar("bob".into())]);
    }

    #[test]
    fn condition_symbols() {
        let symbols = [
            (Operator::Eq, "="),
            (Operator::Ne, "!="),
            (Operator::Gt, ">"),
            (Operator::Ge, ">="),
            (Operator::Lt, "<"),
            (Operator::Le, "<="),
            (Operator::In, "in"),
            (Operator::Like, "like"),
        ];
        for (operator, symbol) in symbols {
            assert_eq!(operator.symbol(), symbol);
            assert_eq!(operator.to_string(), symbol);
        }
    }

    #[test]
    fn condition_in_list() {
        let (sql, args) = Condition::new("id", Operator::In, vec![1, 2, 3]).parse();
        assert_eq!(sql, "id in (?,?,?)");
        assert_eq!(
            args,
            vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)]
        );
        let (sql, args) = Condition::new("id", Operator::In, Vec::<i32>::new()).parse();
        assert_eq!(sql, "id in (NULL)");
        assert!(args.is_empty());
    }

    #[test]
    fn tree_empty() {
        let tree = ConditionTree::new(Logic::And);
        assert!(tree.is_empty());
        assert_eq!(tree.count(), 0);
        assert_eq!(tree.parse(), (String::new(), vec![]));
        let mut tree = ConditionTree::new(Logic::Or);
        tree.add_tree(ConditionTree::new(Logic::And))
            .add_tree(ConditionTree::new(Logic::Or));
        assert!(tree.is_empty());
        assert_eq!(tree.count(), 2);
        assert_eq!(tree.parse(), (String::new(), vec![]));
    }

    #[test]
    fn tree_nested() {
        let (sql, args) = Where::all()
            .eq("a", 1)
            .or(Where::any().eq("b", 2).eq("c", 3))
            .tree()
            .parse();
        assert_eq!(sql, "a = ? and (b = ? or c = ?)");
        assert_eq!(
            args,
            vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)]
        );
    }

    #[test]
    fn tree_order_and_depth() {
        let mut inner = ConditionTree::new(Logic::And);
        inner
            .add_condition(Condition::new("x", Operator::Lt, 1.5))
            .add_condition(Condition::new("y", Operator::In, vec!["a", "b"]));
        let mut tree = ConditionTree::new(Logic::Or);
        tree.add_condition(Condition::new("first", Operator::Eq, true))
            .add_tree(inner)
            .add_tree(ConditionTree::new(Logic::And))
            .add_condition(Condition::new("last", Operator::Like, "%z"));
        let (sql, args) = tree.parse();
        assert_eq!(sql, "first = ? or (x < ? and y in (?,?)) or last like ?");
        assert_eq!(placeholders(&sql), args.len());
        assert_eq!(
            args,
            vec![
                Value::Boolean(true),
                Value::Float64(1.5),
                Value::Varchar("a".into()),
                Value::Varchar("b".into()),
                Value::Varchar("%z".into()),
            ]
        );
        assert_eq!(tree.count(), 4);
        assert_eq!(
            tree.conditions().map(Condition::field).collect::<Vec<_>>(),
            ["first", "x", "y", "last"]
        );
    }

    #[test]
    fn where_like_variants() {
        let (sql, args) = Where::all()
            .l_like("name", "jo")
            .r_like("name", "hn")
            .like("name", "oh")
            .tree()
            .parse();
        assert_eq!(sql, "name like ? and name like ? and name like ?");
        assert_eq!(
            args,
            vec![
                Value::Varchar("jo%".into()),
                Value::Varchar("%hn".into()),
                Value::Varchar("%oh%".into()),
            ]
        );
    }

    #[test]
    fn where_groups() {
        let clause = Where::any()
            .gt("age", 60)
            .and(Where::all().le("age", 18).ne("guardian", 0))
            .is_in("id", [7_u64, 8]);
        assert_eq!(clause.count(), 3);
        let (sql, args) = clause.tree().parse();
        assert_eq!(sql, "age > ? or (age <= ? and guardian != ?) or id in (?,?)");
        assert_eq!(placeholders(&sql), args.len());
        assert_eq!(args[3], Value::UInt64(7));
    }

    #[test]
    fn where_placeholder_count() {
        let clauses = [
            Where::all(),
            Where::all().eq("a", 1),
            Where::any().is_in("a", Vec::<i64>::new()).eq("b", 2),
            Where::all()
                .or(Where::any().is_in("a", [1, 2, 3]).lt("b", 0))
                .and(Where::all().ge("c", 1).or(Where::any().eq("d", 4))),
        ];
        for clause in clauses {
            let (sql, args) = clause.tree().parse();
            assert_eq!(placeholders(&sql), args.len(), "{sql}");
        }
    }
}
